//! Public API surface for the constellation store.
//!
//! This file consolidates the record types shared by the repositories, the
//! ingestion pipeline and the query service. All types are
//! Serialize/Deserialize so an outer transport layer can expose them as-is.
//!
//! Records that embed their fields flat (`Scenario`, `ScenarioDetail`,
//! `Satellite`, `NewSatellite`) deserialize through a JSON map rather than
//! `#[serde(flatten)]`, which cannot buffer arbitrary-precision numbers.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Scenario identifier (database primary key).
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ScenarioId(pub i64);

/// Satellite identifier (database primary key).
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SatelliteId(pub i64);

impl ScenarioId {
    pub fn new(value: i64) -> Self {
        ScenarioId(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl SatelliteId {
    pub fn new(value: i64) -> Self {
        SatelliteId(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for SatelliteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ScenarioId> for i64 {
    fn from(id: ScenarioId) -> Self {
        id.0
    }
}

impl From<SatelliteId> for i64 {
    fn from(id: SatelliteId) -> Self {
        id.0
    }
}

// ============================================================================
// Scenario
// ============================================================================

/// Stored attributes of a scenario, without its identifier.
///
/// This is the shape accepted by create/update and produced by ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioFields {
    pub name: String,
    /// Epoch string with the trailing ` UTCG` marker already removed.
    pub epoch: String,
    pub start_time: String,
    pub end_time: String,
    /// Reference shell altitude in km (> 0)
    pub alt_km: f64,
    /// Reference inclination in degrees
    pub inc_deg: f64,
    /// Number of orbital planes (> 0)
    pub n_planes: i32,
    /// Satellites per plane (> 0)
    pub n_sats_per_plane: i32,
    /// Opaque sensor configuration, stored verbatim.
    pub sensor_config: Option<Value>,
}

/// A stored scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scenario {
    pub id: ScenarioId,
    #[serde(flatten)]
    pub fields: ScenarioFields,
}

/// Lightweight scenario listing entry with its derived satellite count.
///
/// The sensor blob is left out of listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub id: ScenarioId,
    pub name: String,
    pub epoch: String,
    pub start_time: String,
    pub end_time: String,
    pub alt_km: f64,
    pub inc_deg: f64,
    pub n_planes: i32,
    pub n_sats_per_plane: i32,
    pub satellites_count: i64,
}

impl ScenarioSummary {
    pub fn from_scenario(scenario: &Scenario, satellites_count: i64) -> Self {
        let f = &scenario.fields;
        Self {
            id: scenario.id,
            name: f.name.clone(),
            epoch: f.epoch.clone(),
            start_time: f.start_time.clone(),
            end_time: f.end_time.clone(),
            alt_km: f.alt_km,
            inc_deg: f.inc_deg,
            n_planes: f.n_planes,
            n_sats_per_plane: f.n_sats_per_plane,
            satellites_count,
        }
    }
}

/// Full scenario with its derived satellite count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioDetail {
    #[serde(flatten)]
    pub scenario: Scenario,
    pub satellites_count: i64,
}

/// Partial scenario update. `None` leaves the attribute unchanged.
///
/// `sensor_config` uses a nested option so the blob can be cleared
/// (`Some(None)`) as well as replaced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub epoch: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub alt_km: Option<f64>,
    #[serde(default)]
    pub inc_deg: Option<f64>,
    #[serde(default)]
    pub n_planes: Option<i32>,
    #[serde(default)]
    pub n_sats_per_plane: Option<i32>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub sensor_config: Option<Option<Value>>,
}

/// A present key maps to `Some`, so an explicit `null` becomes `Some(None)`.
/// An absent key never reaches this function and stays `None` via `default`.
fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Value>::deserialize(deserializer).map(Some)
}

impl ScenarioPatch {
    /// Apply this patch on top of existing fields.
    pub fn apply(self, mut fields: ScenarioFields) -> ScenarioFields {
        if let Some(v) = self.name {
            fields.name = v;
        }
        if let Some(v) = self.epoch {
            fields.epoch = v;
        }
        if let Some(v) = self.start_time {
            fields.start_time = v;
        }
        if let Some(v) = self.end_time {
            fields.end_time = v;
        }
        if let Some(v) = self.alt_km {
            fields.alt_km = v;
        }
        if let Some(v) = self.inc_deg {
            fields.inc_deg = v;
        }
        if let Some(v) = self.n_planes {
            fields.n_planes = v;
        }
        if let Some(v) = self.n_sats_per_plane {
            fields.n_sats_per_plane = v;
        }
        if let Some(v) = self.sensor_config {
            fields.sensor_config = v;
        }
        fields
    }
}

// ============================================================================
// Satellite
// ============================================================================

/// Slot position and orbital elements of one satellite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatelliteFields {
    /// External identifier, unique within the owning scenario
    pub sat_id: String,
    pub stk_name: String,
    /// Orbital plane, in `[0, n_planes)`
    pub plane_index: i32,
    /// Position within the plane, in `[0, n_sats_per_plane)`
    pub sat_index_in_plane: i32,
    pub alt_km: f64,
    /// Semi-major axis in km (> 0)
    pub sma_km: f64,
    /// Eccentricity, in `[0, 1)`
    pub ecc: f64,
    pub inc_deg: f64,
    /// Right ascension of the ascending node, in `[0, 360)`
    pub raan_deg: f64,
    /// Argument of perigee, in `[0, 360)`
    pub argp_deg: f64,
    /// True anomaly, in `[0, 360)`
    pub ta_deg: f64,
}

impl SatelliteFields {
    /// Slot coordinates used for ordering.
    pub fn slot(&self) -> (i32, i32) {
        (self.plane_index, self.sat_index_in_plane)
    }
}

/// A satellite to be created under an existing scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSatellite {
    pub scenario_id: ScenarioId,
    #[serde(flatten)]
    pub fields: SatelliteFields,
}

/// A stored satellite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Satellite {
    pub id: SatelliteId,
    pub scenario_id: ScenarioId,
    #[serde(flatten)]
    pub fields: SatelliteFields,
}

/// Partial satellite update. `None` leaves the attribute unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SatellitePatch {
    #[serde(default)]
    pub scenario_id: Option<ScenarioId>,
    #[serde(default)]
    pub sat_id: Option<String>,
    #[serde(default)]
    pub stk_name: Option<String>,
    #[serde(default)]
    pub plane_index: Option<i32>,
    #[serde(default)]
    pub sat_index_in_plane: Option<i32>,
    #[serde(default)]
    pub alt_km: Option<f64>,
    #[serde(default)]
    pub sma_km: Option<f64>,
    #[serde(default)]
    pub ecc: Option<f64>,
    #[serde(default)]
    pub inc_deg: Option<f64>,
    #[serde(default)]
    pub raan_deg: Option<f64>,
    #[serde(default)]
    pub argp_deg: Option<f64>,
    #[serde(default)]
    pub ta_deg: Option<f64>,
}

impl SatellitePatch {
    /// Apply this patch on top of a stored satellite.
    pub fn apply(self, satellite: Satellite) -> NewSatellite {
        let mut f = satellite.fields;
        if let Some(v) = self.sat_id {
            f.sat_id = v;
        }
        if let Some(v) = self.stk_name {
            f.stk_name = v;
        }
        if let Some(v) = self.plane_index {
            f.plane_index = v;
        }
        if let Some(v) = self.sat_index_in_plane {
            f.sat_index_in_plane = v;
        }
        if let Some(v) = self.alt_km {
            f.alt_km = v;
        }
        if let Some(v) = self.sma_km {
            f.sma_km = v;
        }
        if let Some(v) = self.ecc {
            f.ecc = v;
        }
        if let Some(v) = self.inc_deg {
            f.inc_deg = v;
        }
        if let Some(v) = self.raan_deg {
            f.raan_deg = v;
        }
        if let Some(v) = self.argp_deg {
            f.argp_deg = v;
        }
        if let Some(v) = self.ta_deg {
            f.ta_deg = v;
        }
        NewSatellite {
            scenario_id: self.scenario_id.unwrap_or(satellite.scenario_id),
            fields: f,
        }
    }
}

/// Filter for satellite listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SatelliteFilter {
    /// Restrict results to one scenario
    #[serde(default)]
    pub scenario_id: Option<ScenarioId>,
}

impl SatelliteFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_scenario(scenario_id: ScenarioId) -> Self {
        Self {
            scenario_id: Some(scenario_id),
        }
    }
}

/// Outcome of a successful ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub scenario_id: ScenarioId,
    pub satellites_count: usize,
}

// ============================================================================
// Flattened records
// ============================================================================

/// Remove `key` from a flat record and decode it.
fn take_field<T: DeserializeOwned>(
    map: &mut Map<String, Value>,
    key: &'static str,
) -> serde_json::Result<T> {
    let value = map
        .remove(key)
        .ok_or_else(|| serde_json::Error::missing_field(key))?;
    serde_json::from_value(value)
}

/// Decode what is left of a flat record as the embedded fields.
fn take_rest<T: DeserializeOwned>(map: Map<String, Value>) -> serde_json::Result<T> {
    serde_json::from_value(Value::Object(map))
}

impl<'de> Deserialize<'de> for Scenario {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut map = Map::<String, Value>::deserialize(deserializer)?;
        let id = take_field(&mut map, "id").map_err(D::Error::custom)?;
        let fields = take_rest(map).map_err(D::Error::custom)?;
        Ok(Self { id, fields })
    }
}

impl<'de> Deserialize<'de> for ScenarioDetail {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut map = Map::<String, Value>::deserialize(deserializer)?;
        let satellites_count =
            take_field(&mut map, "satellites_count").map_err(D::Error::custom)?;
        let id = take_field(&mut map, "id").map_err(D::Error::custom)?;
        let fields = take_rest(map).map_err(D::Error::custom)?;
        Ok(Self {
            scenario: Scenario { id, fields },
            satellites_count,
        })
    }
}

impl<'de> Deserialize<'de> for NewSatellite {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut map = Map::<String, Value>::deserialize(deserializer)?;
        let scenario_id = take_field(&mut map, "scenario_id").map_err(D::Error::custom)?;
        let fields = take_rest(map).map_err(D::Error::custom)?;
        Ok(Self {
            scenario_id,
            fields,
        })
    }
}

impl<'de> Deserialize<'de> for Satellite {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut map = Map::<String, Value>::deserialize(deserializer)?;
        let id = take_field(&mut map, "id").map_err(D::Error::custom)?;
        let scenario_id = take_field(&mut map, "scenario_id").map_err(D::Error::custom)?;
        let fields = take_rest(map).map_err(D::Error::custom)?;
        Ok(Self {
            id,
            scenario_id,
            fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_satellite() -> Satellite {
        Satellite {
            id: SatelliteId::new(7),
            scenario_id: ScenarioId::new(3),
            fields: SatelliteFields {
                sat_id: "SAT-0-1".to_string(),
                stk_name: "Sat_0_1".to_string(),
                plane_index: 0,
                sat_index_in_plane: 1,
                alt_km: 550.0,
                sma_km: 6928.137,
                ecc: 0.0001,
                inc_deg: 53.0,
                raan_deg: 0.0,
                argp_deg: 0.0,
                ta_deg: 180.0,
            },
        }
    }

    #[test]
    fn test_id_display_and_value() {
        let id = ScenarioId::new(42);
        assert_eq!(id.value(), 42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(i64::from(SatelliteId::new(9)), 9);
    }

    #[test]
    fn test_satellite_serializes_flat() {
        let value = serde_json::to_value(sample_satellite()).unwrap();
        assert_eq!(value["id"], json!(7));
        assert_eq!(value["scenario_id"], json!(3));
        assert_eq!(value["sat_id"], json!("SAT-0-1"));
        assert_eq!(value["ta_deg"], json!(180.0));
        assert!(value.get("fields").is_none());
    }

    #[test]
    fn test_scenario_patch_keeps_untouched_fields() {
        let fields = ScenarioFields {
            name: "shell".to_string(),
            epoch: "1 Jan 2025 00:00:00.000".to_string(),
            start_time: "a".to_string(),
            end_time: "b".to_string(),
            alt_km: 550.0,
            inc_deg: 53.0,
            n_planes: 2,
            n_sats_per_plane: 2,
            sensor_config: Some(json!({"fovDeg": 30})),
        };
        let patch = ScenarioPatch {
            name: Some("renamed".to_string()),
            sensor_config: Some(None),
            ..Default::default()
        };
        let patched = patch.apply(fields.clone());
        assert_eq!(patched.name, "renamed");
        assert_eq!(patched.sensor_config, None);
        assert_eq!(patched.n_planes, fields.n_planes);
        assert_eq!(patched.epoch, fields.epoch);
    }

    #[test]
    fn test_scenario_patch_null_sensor_clears_blob() {
        let fields = ScenarioFields {
            name: "shell".to_string(),
            epoch: "e".to_string(),
            start_time: "a".to_string(),
            end_time: "b".to_string(),
            alt_km: 550.0,
            inc_deg: 53.0,
            n_planes: 1,
            n_sats_per_plane: 1,
            sensor_config: Some(json!({"fovDeg": 30})),
        };

        let clear: ScenarioPatch = serde_json::from_str(r#"{"sensor_config": null}"#).unwrap();
        assert_eq!(clear.sensor_config, Some(None));
        assert_eq!(clear.clone().apply(fields.clone()).sensor_config, None);

        let absent: ScenarioPatch = serde_json::from_str(r#"{"name": "x"}"#).unwrap();
        assert_eq!(absent.sensor_config, None);
        assert_eq!(
            absent.apply(fields.clone()).sensor_config,
            fields.sensor_config
        );

        let replace: ScenarioPatch =
            serde_json::from_str(r#"{"sensor_config": {"fovDeg": 45}}"#).unwrap();
        assert_eq!(replace.sensor_config, Some(Some(json!({"fovDeg": 45}))));

        // Clearing survives a serialize/deserialize hop.
        let text = serde_json::to_string(&clear).unwrap();
        let back: ScenarioPatch = serde_json::from_str(&text).unwrap();
        assert_eq!(back, clear);
    }

    #[test]
    fn test_flat_records_read_back() {
        let satellite = sample_satellite();
        let text = serde_json::to_string(&satellite).unwrap();
        let back: Satellite = serde_json::from_str(&text).unwrap();
        assert_eq!(back, satellite);

        let new: NewSatellite = serde_json::from_value(json!({
            "scenario_id": 3,
            "sat_id": "SAT-0-1",
            "stk_name": "Sat_0_1",
            "plane_index": 0,
            "sat_index_in_plane": 1,
            "alt_km": 550.0,
            "sma_km": 6928.137,
            "ecc": 0.0001,
            "inc_deg": 53.0,
            "raan_deg": 0.0,
            "argp_deg": 0.0,
            "ta_deg": 180.0
        }))
        .unwrap();
        assert_eq!(new.scenario_id, ScenarioId::new(3));
        assert_eq!(new.fields, satellite.fields);

        let err = serde_json::from_str::<Satellite>(r#"{"scenario_id": 3}"#).unwrap_err();
        assert!(err.to_string().contains("id"));
    }

    #[test]
    fn test_scenario_detail_keeps_large_sensor_numbers() {
        let text = r#"{
            "id": 4,
            "name": "shell",
            "epoch": "e",
            "start_time": "a",
            "end_time": "b",
            "alt_km": 550.0,
            "inc_deg": 53.0,
            "n_planes": 1,
            "n_sats_per_plane": 1,
            "sensor_config": {"serial": 123456789012345678901234567890, "gain": 0.1},
            "satellites_count": 0
        }"#;
        let detail: ScenarioDetail = serde_json::from_str(text).unwrap();
        assert_eq!(detail.scenario.id, ScenarioId::new(4));
        let sensor = serde_json::to_string(&detail.scenario.fields.sensor_config).unwrap();
        assert!(sensor.contains("123456789012345678901234567890"));

        let back: ScenarioDetail =
            serde_json::from_str(&serde_json::to_string(&detail).unwrap()).unwrap();
        assert_eq!(back, detail);
    }

    #[test]
    fn test_satellite_patch_can_move_scenario() {
        let patch = SatellitePatch {
            scenario_id: Some(ScenarioId::new(5)),
            ecc: Some(0.01),
            ..Default::default()
        };
        let moved = patch.apply(sample_satellite());
        assert_eq!(moved.scenario_id, ScenarioId::new(5));
        assert_eq!(moved.fields.ecc, 0.01);
        assert_eq!(moved.fields.sat_id, "SAT-0-1");
    }
}
