// ============================================================================
// Ingestion Document
// ============================================================================
//
// Typed intermediate representation of the constellation document and the
// functions that parse it from text, a file, or an already decoded JSON value.
// Parsing only establishes shape and types; range checks live in
// `models::validation`.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::repository::{ErrorContext, RepositoryError, RepositoryResult};

/// Root of an ingestion document: scenario metadata plus the satellite list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDocument {
    pub meta: DocumentMeta,
    pub satellites: Vec<DocumentSatellite>,
}

/// The `meta` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMeta {
    /// Scenario name
    pub scenario: String,
    /// Epoch, usually `"<timestamp> UTCG"`
    pub epoch: String,
    pub time_period: TimePeriod,
    pub constellation: ConstellationShell,
    /// Opaque sensor configuration
    pub sensor: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimePeriod {
    pub start: String,
    pub end: String,
}

/// Shell-level constellation configuration.
///
/// Counts are read as `i64` so that out-of-range values surface as
/// validation failures rather than type errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstellationShell {
    pub alt_km: f64,
    pub inc_deg: f64,
    pub n_planes: i64,
    pub n_sats_per_plane: i64,
}

/// One entry of the `satellites` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSatellite {
    pub sat_id: String,
    pub stk_name: String,
    pub plane_index: i64,
    pub sat_index_in_plane: i64,
    pub orbit: DocumentOrbit,
}

/// Orbital elements of one satellite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentOrbit {
    pub alt_km: f64,
    pub sma_km: f64,
    pub ecc: f64,
    pub inc_deg: f64,
    pub raan_deg: f64,
    pub argp_deg: f64,
    pub ta_deg: f64,
}

/// Document path of a scenario attribute.
pub(crate) fn scenario_document_path(attribute: &str) -> &'static str {
    match attribute {
        "name" => "meta.scenario",
        "epoch" => "meta.epoch",
        "start_time" => "meta.timePeriod.start",
        "end_time" => "meta.timePeriod.end",
        "alt_km" => "meta.constellation.altKm",
        "inc_deg" => "meta.constellation.incDeg",
        "n_planes" => "meta.constellation.nPlanes",
        "n_sats_per_plane" => "meta.constellation.nSatsPerPlane",
        "sensor_config" => "meta.sensor",
        _ => "meta",
    }
}

/// Document path of a satellite attribute, relative to `satellites[i]`.
pub(crate) fn satellite_document_path(attribute: &str) -> &'static str {
    match attribute {
        "sat_id" => "satId",
        "stk_name" => "stkName",
        "plane_index" => "planeIndex",
        "sat_index_in_plane" => "satIndexInPlane",
        "alt_km" => "orbit.altKm",
        "sma_km" => "orbit.smaKm",
        "ecc" => "orbit.ecc",
        "inc_deg" => "orbit.incDeg",
        "raan_deg" => "orbit.raanDeg",
        "argp_deg" => "orbit.argpDeg",
        "ta_deg" => "orbit.taDeg",
        _ => "orbit",
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Deserialize one section, reporting failures as validation errors at the
/// exact document path.
fn deserialize_section<T: DeserializeOwned>(
    value: Value,
    prefix: &str,
    record_index: Option<usize>,
) -> RepositoryResult<T> {
    serde_path_to_error::deserialize(value).map_err(|err| {
        let path = err.path().to_string();
        let field = if path == "." || path.is_empty() {
            prefix.to_string()
        } else {
            format!("{}.{}", prefix, path)
        };
        let mut context = ErrorContext::new("parse_document").with_field(field);
        context = match record_index {
            Some(index) => context.with_entity("satellite").with_record_index(index),
            None => context.with_entity("scenario"),
        };
        RepositoryError::validation_with_context(err.inner().to_string(), context)
    })
}

/// Parse a document from an already decoded JSON value.
///
/// A missing or mistyped `meta`/`satellites` section is a
/// [`RepositoryError::DocumentParseError`]; a missing or mistyped field inside
/// a section is a [`RepositoryError::ValidationError`] naming its path.
pub fn parse_document_value(value: Value) -> RepositoryResult<ScenarioDocument> {
    let mut root = match value {
        Value::Object(map) => map,
        other => {
            return Err(RepositoryError::document_parse(format!(
                "Document must be a JSON object, found {}",
                json_type_name(&other)
            )))
        }
    };

    let meta = match root.remove("meta") {
        Some(meta @ Value::Object(_)) => meta,
        Some(other) => {
            return Err(RepositoryError::document_parse(format!(
                "'meta' must be an object, found {}",
                json_type_name(&other)
            )))
        }
        None => return Err(RepositoryError::document_parse("Missing 'meta' section")),
    };

    let items = match root.remove("satellites") {
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(RepositoryError::document_parse(format!(
                "'satellites' must be an array, found {}",
                json_type_name(&other)
            )))
        }
        None => {
            return Err(RepositoryError::document_parse(
                "Missing 'satellites' section",
            ))
        }
    };

    let meta: DocumentMeta = deserialize_section(meta, "meta", None)?;

    let mut satellites = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        let prefix = format!("satellites[{}]", idx);
        satellites.push(deserialize_section(item, &prefix, Some(idx))?);
    }

    Ok(ScenarioDocument { meta, satellites })
}

/// Parse a document from a JSON string.
pub fn parse_document_str(json: &str) -> RepositoryResult<ScenarioDocument> {
    let value: Value = serde_json::from_str(json).map_err(|e| {
        RepositoryError::document_parse(format!(
            "Invalid JSON at line {}, column {}: {}",
            e.line(),
            e.column(),
            e
        ))
    })?;
    parse_document_value(value)
}

/// Parse a document from a file.
pub fn parse_document_file(path: &Path) -> RepositoryResult<ScenarioDocument> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        RepositoryError::DocumentParseError {
            message: format!("Failed to read document: {}", e),
            context: ErrorContext::new("parse_document")
                .with_entity("document")
                .with_details(path.display().to_string()),
        }
    })?;
    parse_document_str(&content)
}
