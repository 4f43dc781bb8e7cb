//! Read and mutation surface over scenarios and satellites.
//!
//! Reads never mutate state. Every write re-runs the field checks of
//! [`crate::models::validation`] before the repository is called; the
//! repository itself enforces the relational rules (owner exists, slot inside
//! the owner's shell, unique `sat_id` per scenario).

use std::sync::Arc;

use log::info;

use crate::api::{
    NewSatellite, Satellite, SatelliteFilter, SatelliteId, SatellitePatch, Scenario,
    ScenarioDetail, ScenarioFields, ScenarioId, ScenarioPatch, ScenarioSummary,
};
use crate::db::repository::{FullRepository, RepositoryResult};
use crate::models::validation::{validate_satellite, validate_scenario};

/// Query service over a repository.
#[derive(Clone)]
pub struct QueryService {
    repo: Arc<dyn FullRepository>,
}

impl QueryService {
    pub fn new(repo: Arc<dyn FullRepository>) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &Arc<dyn FullRepository> {
        &self.repo
    }

    /// Check if the underlying store is reachable.
    pub async fn health_check(&self) -> RepositoryResult<bool> {
        self.repo.health_check().await
    }

    // ==================== Scenarios ====================

    /// All scenarios, newest first, each with its current satellite count.
    pub async fn list_scenarios(&self) -> RepositoryResult<Vec<ScenarioSummary>> {
        let rows = self.repo.list_scenarios_with_counts().await?;
        Ok(rows
            .iter()
            .map(|(scenario, count)| ScenarioSummary::from_scenario(scenario, *count))
            .collect())
    }

    /// One scenario with every attribute and its satellite count.
    pub async fn get_scenario(&self, scenario_id: ScenarioId) -> RepositoryResult<ScenarioDetail> {
        let scenario = self.repo.get_scenario(scenario_id).await?;
        let satellites_count = self.repo.count_satellites(scenario_id).await?;
        Ok(ScenarioDetail {
            scenario,
            satellites_count,
        })
    }

    /// Create a scenario without satellites.
    pub async fn create_scenario(&self, fields: &ScenarioFields) -> RepositoryResult<Scenario> {
        validate_scenario(fields, "create_scenario")?;
        let created = self.repo.create_scenario(fields).await?;
        info!("Created scenario {} ('{}')", created.id, created.fields.name);
        Ok(created)
    }

    /// Replace every attribute of a scenario.
    pub async fn update_scenario(
        &self,
        scenario_id: ScenarioId,
        fields: &ScenarioFields,
    ) -> RepositoryResult<Scenario> {
        validate_scenario(fields, "update_scenario")?;
        self.repo.update_scenario(scenario_id, fields).await
    }

    /// Change only the attributes present in `patch`.
    pub async fn patch_scenario(
        &self,
        scenario_id: ScenarioId,
        patch: ScenarioPatch,
    ) -> RepositoryResult<Scenario> {
        let current = self.repo.get_scenario(scenario_id).await?;
        let fields = patch.apply(current.fields);
        validate_scenario(&fields, "patch_scenario")?;
        self.repo.update_scenario(scenario_id, &fields).await
    }

    /// Delete a scenario and its satellites. Returns the number of satellites removed.
    pub async fn delete_scenario(&self, scenario_id: ScenarioId) -> RepositoryResult<usize> {
        let removed = self.repo.delete_scenario(scenario_id).await?;
        info!(
            "Deleted scenario {} and {} satellites",
            scenario_id, removed
        );
        Ok(removed)
    }

    // ==================== Satellites ====================

    /// Satellites ordered by plane and slot, optionally for one scenario only.
    pub async fn list_satellites(&self, filter: SatelliteFilter) -> RepositoryResult<Vec<Satellite>> {
        self.repo.list_satellites(filter).await
    }

    /// The full ordered satellite set of a scenario; NotFound if it does not exist.
    pub async fn get_satellites_of_scenario(
        &self,
        scenario_id: ScenarioId,
    ) -> RepositoryResult<Vec<Satellite>> {
        self.repo.get_satellites_for_scenario(scenario_id).await
    }

    pub async fn get_satellite(&self, satellite_id: SatelliteId) -> RepositoryResult<Satellite> {
        self.repo.get_satellite(satellite_id).await
    }

    /// Look a satellite up by its external identifier within a scenario.
    pub async fn find_satellite(
        &self,
        scenario_id: ScenarioId,
        sat_id: &str,
    ) -> RepositoryResult<Satellite> {
        self.repo.find_satellite(scenario_id, sat_id).await
    }

    pub async fn create_satellite(&self, satellite: &NewSatellite) -> RepositoryResult<Satellite> {
        validate_satellite(&satellite.fields, "create_satellite")?;
        self.repo.create_satellite(satellite).await
    }

    /// Replace every attribute of a satellite, possibly moving it to another scenario.
    pub async fn update_satellite(
        &self,
        satellite_id: SatelliteId,
        satellite: &NewSatellite,
    ) -> RepositoryResult<Satellite> {
        validate_satellite(&satellite.fields, "update_satellite")?;
        self.repo.update_satellite(satellite_id, satellite).await
    }

    pub async fn patch_satellite(
        &self,
        satellite_id: SatelliteId,
        patch: SatellitePatch,
    ) -> RepositoryResult<Satellite> {
        let current = self.repo.get_satellite(satellite_id).await?;
        let updated = patch.apply(current);
        validate_satellite(&updated.fields, "patch_satellite")?;
        self.repo.update_satellite(satellite_id, &updated).await
    }

    pub async fn delete_satellite(&self, satellite_id: SatelliteId) -> RepositoryResult<()> {
        self.repo.delete_satellite(satellite_id).await
    }
}
