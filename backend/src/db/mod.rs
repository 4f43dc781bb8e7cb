//! Database module for scenario and satellite storage.
//!
//! This module provides abstractions for database operations via the Repository pattern,
//! allowing different storage backends to be swapped easily.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Application Layer (CLI, embedding services)            │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Service Layer (crate::services)                        │
//! │  - IngestionPipeline: parse, validate, atomic store     │
//! │  - QueryService: validated CRUD and listings            │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Repository Traits (repository/) - Abstract Interface   │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!          ┌──────────┴──────────┐
//!          │                     │
//!   ┌──────▼──────┐       ┌──────▼──────┐
//!   │  Postgres   │       │    Local    │
//!   │  (Diesel)   │       │ (in-memory) │
//!   └─────────────┘       └─────────────┘
//! ```
//!
//! Repositories are built explicitly from a [`PostgresConfig`] or a
//! [`RepositoryConfig`] through the [`RepositoryFactory`] and handed to the
//! services at construction time.

#[cfg(not(any(feature = "postgres-repo", feature = "local-repo")))]
compile_error!("Enable at least one repository backend feature.");

pub mod config;
pub mod factory;
pub mod repo_config;
pub mod repositories;
pub mod repository;

pub use config::{
    clamp_bulk_insert_rows, PostgresConfig, DEFAULT_BULK_INSERT_ROWS, MAX_BULK_INSERT_ROWS,
    SATELLITE_BINDS_PER_ROW,
};
pub use factory::{RepositoryBuilder, RepositoryFactory, RepositoryType};
pub use repo_config::RepositoryConfig;
pub use repositories::LocalRepository;
#[cfg(feature = "postgres-repo")]
pub use repositories::{PoolStats, PostgresRepository};
pub use repository::{
    ErrorContext, FullRepository, RepositoryError, RepositoryResult, SatelliteRepository,
    ScenarioRepository,
};
