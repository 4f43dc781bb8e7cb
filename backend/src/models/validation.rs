//! Field-by-field invariant checks.
//!
//! The same checks guard both entry points into the store: a parsed
//! ingestion document is turned into validated rows here before any
//! transaction is opened, and the CRUD surface re-runs them on every create
//! and update.

use std::collections::HashMap;

use serde_json::Value;

use crate::api::{SatelliteFields, ScenarioFields};
use crate::db::repository::{ErrorContext, RepositoryError, RepositoryResult};
use crate::models::document::{
    satellite_document_path, scenario_document_path, DocumentSatellite, ScenarioDocument,
};

/// Literal marker removed from the end of the epoch string.
pub const EPOCH_SUFFIX: &str = " UTCG";

/// Maximum length of `name` and `stk_name`.
pub const MAX_NAME_LEN: usize = 255;

/// Maximum length of `epoch`, `start_time`, `end_time` and `sat_id`.
pub const MAX_LABEL_LEN: usize = 100;

/// One violated invariant, keyed by attribute name.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldViolation {
    pub field: &'static str,
    pub reason: String,
}

impl FieldViolation {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Slot bounds defined by a scenario's shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShellBounds {
    pub n_planes: i32,
    pub n_sats_per_plane: i32,
}

impl ShellBounds {
    pub fn of(scenario: &ScenarioFields) -> Self {
        Self {
            n_planes: scenario.n_planes,
            n_sats_per_plane: scenario.n_sats_per_plane,
        }
    }

    /// Whether `(plane, slot)` lies inside the shell.
    pub fn contains(&self, plane: i32, slot: i32) -> bool {
        (0..self.n_planes).contains(&plane) && (0..self.n_sats_per_plane).contains(&slot)
    }
}

/// Validated rows produced from an ingestion document.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedImport {
    pub scenario: ScenarioFields,
    pub satellites: Vec<SatelliteFields>,
}

/// Remove the trailing ` UTCG` marker. No further timestamp parsing is done.
pub fn normalize_epoch(epoch: &str) -> String {
    epoch.strip_suffix(EPOCH_SUFFIX).unwrap_or(epoch).to_string()
}

fn check_text(
    field: &'static str,
    value: &str,
    max_len: usize,
    required: bool,
) -> Result<(), FieldViolation> {
    if required && value.trim().is_empty() {
        return Err(FieldViolation::new(field, "must not be empty"));
    }
    let len = value.chars().count();
    if len > max_len {
        return Err(FieldViolation::new(
            field,
            format!("must be at most {} characters, got {}", max_len, len),
        ));
    }
    Ok(())
}

fn check_finite(field: &'static str, value: f64) -> Result<(), FieldViolation> {
    if !value.is_finite() {
        return Err(FieldViolation::new(
            field,
            format!("must be a finite number, got {}", value),
        ));
    }
    Ok(())
}

fn check_positive(field: &'static str, value: f64) -> Result<(), FieldViolation> {
    check_finite(field, value)?;
    if value <= 0.0 {
        return Err(FieldViolation::new(
            field,
            format!("must be > 0, got {}", value),
        ));
    }
    Ok(())
}

fn check_angle(field: &'static str, value: f64) -> Result<(), FieldViolation> {
    check_finite(field, value)?;
    if !(0.0..360.0).contains(&value) {
        return Err(FieldViolation::new(
            field,
            format!("must be in [0, 360), got {}", value),
        ));
    }
    Ok(())
}

/// Check every scenario attribute.
pub fn check_scenario_fields(fields: &ScenarioFields) -> Result<(), FieldViolation> {
    check_text("name", &fields.name, MAX_NAME_LEN, true)?;
    check_text("epoch", &fields.epoch, MAX_LABEL_LEN, false)?;
    check_text("start_time", &fields.start_time, MAX_LABEL_LEN, false)?;
    check_text("end_time", &fields.end_time, MAX_LABEL_LEN, false)?;
    check_positive("alt_km", fields.alt_km)?;
    check_finite("inc_deg", fields.inc_deg)?;
    if fields.n_planes <= 0 {
        return Err(FieldViolation::new(
            "n_planes",
            format!("must be > 0, got {}", fields.n_planes),
        ));
    }
    if fields.n_sats_per_plane <= 0 {
        return Err(FieldViolation::new(
            "n_sats_per_plane",
            format!("must be > 0, got {}", fields.n_sats_per_plane),
        ));
    }
    Ok(())
}

/// Check the attributes of a satellite that do not depend on its owner.
pub fn check_satellite_fields(fields: &SatelliteFields) -> Result<(), FieldViolation> {
    check_text("sat_id", &fields.sat_id, MAX_LABEL_LEN, true)?;
    check_text("stk_name", &fields.stk_name, MAX_NAME_LEN, false)?;
    if fields.plane_index < 0 {
        return Err(FieldViolation::new(
            "plane_index",
            format!("must be >= 0, got {}", fields.plane_index),
        ));
    }
    if fields.sat_index_in_plane < 0 {
        return Err(FieldViolation::new(
            "sat_index_in_plane",
            format!("must be >= 0, got {}", fields.sat_index_in_plane),
        ));
    }
    check_finite("alt_km", fields.alt_km)?;
    check_positive("sma_km", fields.sma_km)?;
    check_finite("ecc", fields.ecc)?;
    if !(0.0..1.0).contains(&fields.ecc) {
        return Err(FieldViolation::new(
            "ecc",
            format!("must be in [0, 1), got {}", fields.ecc),
        ));
    }
    check_finite("inc_deg", fields.inc_deg)?;
    check_angle("raan_deg", fields.raan_deg)?;
    check_angle("argp_deg", fields.argp_deg)?;
    check_angle("ta_deg", fields.ta_deg)?;
    Ok(())
}

/// Check that a satellite's slot lies inside its owner's shell.
pub fn check_slot(fields: &SatelliteFields, shell: ShellBounds) -> Result<(), FieldViolation> {
    if fields.plane_index >= shell.n_planes {
        return Err(FieldViolation::new(
            "plane_index",
            format!(
                "must be < n_planes ({}), got {}",
                shell.n_planes, fields.plane_index
            ),
        ));
    }
    if fields.sat_index_in_plane >= shell.n_sats_per_plane {
        return Err(FieldViolation::new(
            "sat_index_in_plane",
            format!(
                "must be < n_sats_per_plane ({}), got {}",
                shell.n_sats_per_plane, fields.sat_index_in_plane
            ),
        ));
    }
    Ok(())
}

/// Validate scenario attributes for a CRUD operation.
pub fn validate_scenario(fields: &ScenarioFields, operation: &str) -> RepositoryResult<()> {
    check_scenario_fields(fields).map_err(|v| {
        RepositoryError::validation_with_context(
            format!("{} {}", v.field, v.reason),
            ErrorContext::new(operation)
                .with_entity("scenario")
                .with_field(v.field),
        )
    })
}

/// Validate satellite attributes for a CRUD operation.
pub fn validate_satellite(fields: &SatelliteFields, operation: &str) -> RepositoryResult<()> {
    check_satellite_fields(fields).map_err(|v| {
        RepositoryError::validation_with_context(
            format!("{} {}", v.field, v.reason),
            ErrorContext::new(operation)
                .with_entity("satellite")
                .with_field(v.field),
        )
    })
}

/// Validate a satellite slot against its owner's shell for a store operation.
pub fn validate_slot(
    fields: &SatelliteFields,
    shell: ShellBounds,
    operation: &str,
) -> RepositoryResult<()> {
    check_slot(fields, shell).map_err(|v| {
        RepositoryError::validation_with_context(
            format!("{} {}", v.field, v.reason),
            ErrorContext::new(operation)
                .with_entity("satellite")
                .with_field(v.field)
                .with_details(format!("sat_id={}", fields.sat_id)),
        )
    })
}

/// Check a batch of satellites about to be stored under a new scenario.
///
/// Every slot must lie inside the scenario's shell and every `sat_id` must be
/// unique within the batch. Errors carry the offending record index.
pub fn validate_import_rows(
    scenario: &ScenarioFields,
    satellites: &[SatelliteFields],
    operation: &str,
) -> RepositoryResult<()> {
    let shell = ShellBounds::of(scenario);
    let mut seen: HashMap<&str, usize> = HashMap::with_capacity(satellites.len());
    for (index, fields) in satellites.iter().enumerate() {
        if let Err(mut err) = validate_slot(fields, shell, operation) {
            if let RepositoryError::ValidationError { context, .. } = &mut err {
                context.record_index = Some(index);
            }
            return Err(err);
        }
        if let Some(first) = seen.insert(fields.sat_id.as_str(), index) {
            return Err(RepositoryError::constraint_with_context(
                format!(
                    "sat_id '{}' appears more than once (first at index {})",
                    fields.sat_id, first
                ),
                ErrorContext::new(operation)
                    .with_entity("satellite")
                    .with_field("sat_id")
                    .with_record_index(index),
            ));
        }
    }
    Ok(())
}

/// Validation error for a shell update that would strand owned satellites.
pub fn shell_shrink_error(
    operation: &str,
    shell: ShellBounds,
    max_plane: Option<i32>,
    max_slot: Option<i32>,
) -> Option<RepositoryError> {
    let violation = match (max_plane, max_slot) {
        (Some(p), _) if p >= shell.n_planes => Some(FieldViolation::new(
            "n_planes",
            format!("must be > {} to cover owned satellites", p),
        )),
        (_, Some(s)) if s >= shell.n_sats_per_plane => Some(FieldViolation::new(
            "n_sats_per_plane",
            format!("must be > {} to cover owned satellites", s),
        )),
        _ => None,
    }?;
    Some(RepositoryError::validation_with_context(
        format!("{} {}", violation.field, violation.reason),
        ErrorContext::new(operation)
            .with_entity("scenario")
            .with_field(violation.field),
    ))
}

fn document_int(value: i64, path: String, record_index: Option<usize>) -> RepositoryResult<i32> {
    i32::try_from(value).map_err(|_| {
        let mut context = ErrorContext::new("validate_document").with_field(path.clone());
        context = match record_index {
            Some(index) => context.with_entity("satellite").with_record_index(index),
            None => context.with_entity("scenario"),
        };
        RepositoryError::validation_with_context(
            format!("{} is outside the 32-bit integer range: {}", path, value),
            context,
        )
    })
}

fn scenario_violation(v: FieldViolation) -> RepositoryError {
    let path = scenario_document_path(v.field);
    RepositoryError::validation_with_context(
        format!("{} {}", path, v.reason),
        ErrorContext::new("validate_document")
            .with_entity("scenario")
            .with_field(path),
    )
}

fn satellite_violation(index: usize, v: FieldViolation) -> RepositoryError {
    let path = format!("satellites[{}].{}", index, satellite_document_path(v.field));
    RepositoryError::validation_with_context(
        format!("{} {}", path, v.reason),
        ErrorContext::new("validate_document")
            .with_entity("satellite")
            .with_field(path)
            .with_record_index(index),
    )
}

fn satellite_fields(index: usize, sat: &DocumentSatellite) -> RepositoryResult<SatelliteFields> {
    let orbit = &sat.orbit;
    Ok(SatelliteFields {
        sat_id: sat.sat_id.clone(),
        stk_name: sat.stk_name.clone(),
        plane_index: document_int(
            sat.plane_index,
            format!("satellites[{}].planeIndex", index),
            Some(index),
        )?,
        sat_index_in_plane: document_int(
            sat.sat_index_in_plane,
            format!("satellites[{}].satIndexInPlane", index),
            Some(index),
        )?,
        alt_km: orbit.alt_km,
        sma_km: orbit.sma_km,
        ecc: orbit.ecc,
        inc_deg: orbit.inc_deg,
        raan_deg: orbit.raan_deg,
        argp_deg: orbit.argp_deg,
        ta_deg: orbit.ta_deg,
    })
}

/// Turn a parsed document into validated rows.
///
/// Every field is checked before this returns; the first violation aborts
/// with a [`RepositoryError::ValidationError`] naming the document path and,
/// for satellites, the record index. A `satId` that repeats an earlier entry
/// is a [`RepositoryError::ConstraintViolation`].
pub fn validate_document(document: &ScenarioDocument) -> RepositoryResult<ValidatedImport> {
    let meta = &document.meta;
    let shell = &meta.constellation;

    let scenario = ScenarioFields {
        name: meta.scenario.clone(),
        epoch: normalize_epoch(&meta.epoch),
        start_time: meta.time_period.start.clone(),
        end_time: meta.time_period.end.clone(),
        alt_km: shell.alt_km,
        inc_deg: shell.inc_deg,
        n_planes: document_int(
            shell.n_planes,
            scenario_document_path("n_planes").to_string(),
            None,
        )?,
        n_sats_per_plane: document_int(
            shell.n_sats_per_plane,
            scenario_document_path("n_sats_per_plane").to_string(),
            None,
        )?,
        sensor_config: match &meta.sensor {
            Value::Null => None,
            other => Some(other.clone()),
        },
    };
    check_scenario_fields(&scenario).map_err(scenario_violation)?;
    let bounds = ShellBounds::of(&scenario);

    let mut seen: HashMap<&str, usize> = HashMap::with_capacity(document.satellites.len());
    let mut satellites = Vec::with_capacity(document.satellites.len());
    for (index, sat) in document.satellites.iter().enumerate() {
        let fields = satellite_fields(index, sat)?;
        check_satellite_fields(&fields).map_err(|v| satellite_violation(index, v))?;
        check_slot(&fields, bounds).map_err(|v| satellite_violation(index, v))?;

        if let Some(first) = seen.insert(sat.sat_id.as_str(), index) {
            return Err(RepositoryError::constraint_with_context(
                format!(
                    "satId '{}' is repeated (first used at index {})",
                    sat.sat_id, first
                ),
                ErrorContext::new("validate_document")
                    .with_entity("satellite")
                    .with_field(format!("satellites[{}].satId", index))
                    .with_record_index(index),
            ));
        }
        satellites.push(fields);
    }

    Ok(ValidatedImport {
        scenario,
        satellites,
    })
}
