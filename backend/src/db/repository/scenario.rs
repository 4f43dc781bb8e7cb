//! Scenario repository trait: scenario CRUD and atomic ingestion.
//!
//! A scenario owns its satellites exclusively, so the operations that create
//! or destroy a scenario also act on its satellite set.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::{ImportSummary, SatelliteFields, Scenario, ScenarioFields, ScenarioId};

/// Repository trait for scenario database operations.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait ScenarioRepository: Send + Sync {
    // ==================== Health & Connection ====================

    /// Check if the store is reachable.
    ///
    /// # Returns
    /// - `Ok(true)` if the store is healthy
    /// - `Ok(false)` if the store is unhealthy but no error occurred
    /// - `Err(RepositoryError)` if an error occurred during the check
    async fn health_check(&self) -> RepositoryResult<bool>;

    // ==================== Ingestion ====================

    /// Store a scenario together with its full satellite set as one atomic unit.
    ///
    /// The scenario row is inserted first and its assigned identifier is used
    /// as the owner of every satellite row. Satellites are written with
    /// multi-row inserts. Either everything becomes visible at once or, on any
    /// failure, nothing does.
    ///
    /// Callers are expected to pass validated data; implementations still
    /// enforce the relational constraints (unique `sat_id` per scenario, slot
    /// within the shell).
    ///
    /// # Returns
    /// * `Ok(ImportSummary)` - New scenario id and number of satellites written
    /// * `Err(RepositoryError::ConstraintViolation)` - If a constraint fails; nothing is stored
    /// * `Err(RepositoryError::ConnectivityError)` - If the store is unreachable or aborts
    async fn store_scenario_with_satellites(
        &self,
        scenario: &ScenarioFields,
        satellites: &[SatelliteFields],
    ) -> RepositoryResult<ImportSummary>;

    // ==================== Scenario CRUD ====================

    /// Create a scenario without satellites.
    async fn create_scenario(&self, scenario: &ScenarioFields) -> RepositoryResult<Scenario>;

    /// Retrieve a scenario by ID.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If the scenario doesn't exist
    async fn get_scenario(&self, scenario_id: ScenarioId) -> RepositoryResult<Scenario>;

    /// List all scenarios, most recently created first, each paired with the
    /// number of satellites it owns at the time of the read.
    async fn list_scenarios_with_counts(&self) -> RepositoryResult<Vec<(Scenario, i64)>>;

    /// Count the satellites owned by a scenario.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If the scenario doesn't exist
    async fn count_satellites(&self, scenario_id: ScenarioId) -> RepositoryResult<i64>;

    /// Replace every attribute of a scenario.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If the scenario doesn't exist
    /// * `Err(RepositoryError::ValidationError)` - If the new shell no longer
    ///   covers the slot of an owned satellite
    async fn update_scenario(
        &self,
        scenario_id: ScenarioId,
        scenario: &ScenarioFields,
    ) -> RepositoryResult<Scenario>;

    /// Delete a scenario and, by cascade, all of its satellites.
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of satellites removed with the scenario
    /// * `Err(RepositoryError::NotFound)` - If the scenario doesn't exist
    async fn delete_scenario(&self, scenario_id: ScenarioId) -> RepositoryResult<usize>;
}
