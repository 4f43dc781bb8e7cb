//! Satellite repository trait: satellite CRUD and ordered listings.
//!
//! All listings are ordered by `(plane_index, sat_index_in_plane)` ascending,
//! with the satellite id as a final tie-breaker.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::{NewSatellite, Satellite, SatelliteFilter, SatelliteId, ScenarioId};

/// Repository trait for satellite database operations.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait SatelliteRepository: Send + Sync {
    /// Create a satellite under an existing scenario.
    ///
    /// # Returns
    /// * `Err(RepositoryError::ConstraintViolation)` - If the owning scenario does
    ///   not exist or the `sat_id` is already used in it
    /// * `Err(RepositoryError::ValidationError)` - If the slot is outside the
    ///   owning scenario's shell
    async fn create_satellite(&self, satellite: &NewSatellite) -> RepositoryResult<Satellite>;

    /// Retrieve a satellite by ID.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If the satellite doesn't exist
    async fn get_satellite(&self, satellite_id: SatelliteId) -> RepositoryResult<Satellite>;

    /// Look a satellite up by its external identifier within a scenario.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If no such satellite exists
    async fn find_satellite(
        &self,
        scenario_id: ScenarioId,
        sat_id: &str,
    ) -> RepositoryResult<Satellite>;

    /// List satellites, optionally restricted to one scenario.
    ///
    /// An unknown scenario in the filter yields an empty list.
    async fn list_satellites(&self, filter: SatelliteFilter) -> RepositoryResult<Vec<Satellite>>;

    /// Get the full ordered satellite set of a scenario.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If the scenario doesn't exist
    async fn get_satellites_for_scenario(
        &self,
        scenario_id: ScenarioId,
    ) -> RepositoryResult<Vec<Satellite>>;

    /// Replace every attribute of a satellite, including its owner.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If the satellite doesn't exist
    /// * `Err(RepositoryError::ConstraintViolation)` - Same rules as create
    async fn update_satellite(
        &self,
        satellite_id: SatelliteId,
        satellite: &NewSatellite,
    ) -> RepositoryResult<Satellite>;

    /// Delete a satellite.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If the satellite doesn't exist
    async fn delete_satellite(&self, satellite_id: SatelliteId) -> RepositoryResult<()>;
}
