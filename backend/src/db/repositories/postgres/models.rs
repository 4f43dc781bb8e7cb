use diesel::prelude::*;
use serde_json::Value;

use super::schema::{satellites, scenarios};
use crate::api::{
    NewSatellite, Satellite, SatelliteFields, SatelliteId, Scenario, ScenarioFields, ScenarioId,
};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = scenarios)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ScenarioRow {
    pub id: i64,
    pub name: String,
    pub epoch: String,
    pub start_time: String,
    pub end_time: String,
    pub alt_km: f64,
    pub inc_deg: f64,
    pub n_planes: i32,
    pub n_sats_per_plane: i32,
    pub sensor_config: Option<Value>,
}

/// Insert and full-replacement row for `scenarios`.
///
/// `treat_none_as_null` makes an update with `sensor_config: None` clear the
/// column instead of skipping it.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = scenarios)]
#[diesel(treat_none_as_null = true)]
pub struct NewScenarioRow {
    pub name: String,
    pub epoch: String,
    pub start_time: String,
    pub end_time: String,
    pub alt_km: f64,
    pub inc_deg: f64,
    pub n_planes: i32,
    pub n_sats_per_plane: i32,
    pub sensor_config: Option<Value>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = satellites)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SatelliteRow {
    pub id: i64,
    pub scenario_id: i64,
    pub sat_id: String,
    pub stk_name: String,
    pub plane_index: i32,
    pub sat_index_in_plane: i32,
    pub alt_km: f64,
    pub sma_km: f64,
    pub ecc: f64,
    pub inc_deg: f64,
    pub raan_deg: f64,
    pub argp_deg: f64,
    pub ta_deg: f64,
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = satellites)]
pub struct NewSatelliteRow {
    pub scenario_id: i64,
    pub sat_id: String,
    pub stk_name: String,
    pub plane_index: i32,
    pub sat_index_in_plane: i32,
    pub alt_km: f64,
    pub sma_km: f64,
    pub ecc: f64,
    pub inc_deg: f64,
    pub raan_deg: f64,
    pub argp_deg: f64,
    pub ta_deg: f64,
}

impl From<&ScenarioFields> for NewScenarioRow {
    fn from(fields: &ScenarioFields) -> Self {
        Self {
            name: fields.name.clone(),
            epoch: fields.epoch.clone(),
            start_time: fields.start_time.clone(),
            end_time: fields.end_time.clone(),
            alt_km: fields.alt_km,
            inc_deg: fields.inc_deg,
            n_planes: fields.n_planes,
            n_sats_per_plane: fields.n_sats_per_plane,
            sensor_config: fields.sensor_config.clone(),
        }
    }
}

impl From<ScenarioRow> for Scenario {
    fn from(row: ScenarioRow) -> Self {
        Scenario {
            id: ScenarioId(row.id),
            fields: ScenarioFields {
                name: row.name,
                epoch: row.epoch,
                start_time: row.start_time,
                end_time: row.end_time,
                alt_km: row.alt_km,
                inc_deg: row.inc_deg,
                n_planes: row.n_planes,
                n_sats_per_plane: row.n_sats_per_plane,
                sensor_config: row.sensor_config,
            },
        }
    }
}

impl NewSatelliteRow {
    pub fn new(scenario_id: ScenarioId, fields: &SatelliteFields) -> Self {
        Self {
            scenario_id: scenario_id.0,
            sat_id: fields.sat_id.clone(),
            stk_name: fields.stk_name.clone(),
            plane_index: fields.plane_index,
            sat_index_in_plane: fields.sat_index_in_plane,
            alt_km: fields.alt_km,
            sma_km: fields.sma_km,
            ecc: fields.ecc,
            inc_deg: fields.inc_deg,
            raan_deg: fields.raan_deg,
            argp_deg: fields.argp_deg,
            ta_deg: fields.ta_deg,
        }
    }
}

impl From<&NewSatellite> for NewSatelliteRow {
    fn from(satellite: &NewSatellite) -> Self {
        Self::new(satellite.scenario_id, &satellite.fields)
    }
}

impl From<SatelliteRow> for Satellite {
    fn from(row: SatelliteRow) -> Self {
        Satellite {
            id: SatelliteId(row.id),
            scenario_id: ScenarioId(row.scenario_id),
            fields: SatelliteFields {
                sat_id: row.sat_id,
                stk_name: row.stk_name,
                plane_index: row.plane_index,
                sat_index_in_plane: row.sat_index_in_plane,
                alt_km: row.alt_km,
                sma_km: row.sma_km,
                ecc: row.ecc,
                inc_deg: row.inc_deg,
                raan_deg: row.raan_deg,
                argp_deg: row.argp_deg,
                ta_deg: row.ta_deg,
            },
        }
    }
}
