//! Repository trait definitions for database operations.
//!
//! The store is split into two focused traits:
//!
//! - [`scenario`]: scenario CRUD and the atomic scenario + satellites write
//! - [`satellite`]: satellite CRUD and ordered, filtered listings
//! - [`error`]: error taxonomy shared by every layer
//!
//! A complete implementation implements both traits and is usable wherever a
//! [`FullRepository`] is expected.

pub mod error;
pub mod satellite;
pub mod scenario;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};

pub use satellite::SatelliteRepository;
pub use scenario::ScenarioRepository;

/// Composite trait bound for a complete repository implementation.
///
/// # Example
///
/// ```ignore
/// async fn import<R: FullRepository + ?Sized>(
///     repo: &R,
///     scenario: &ScenarioFields,
///     satellites: &[SatelliteFields],
/// ) -> RepositoryResult<ScenarioId> {
///     let summary = repo.store_scenario_with_satellites(scenario, satellites).await?;
///     Ok(summary.scenario_id)
/// }
/// ```
pub trait FullRepository: ScenarioRepository + SatelliteRepository {}

// Blanket implementation: any type implementing both traits is a FullRepository
impl<T> FullRepository for T where T: ScenarioRepository + SatelliteRepository {}
