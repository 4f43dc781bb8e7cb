//! # Constellation Store
//!
//! Storage and ingestion engine for satellite constellation scenarios.
//!
//! A scenario describes one constellation shell (altitude, inclination,
//! number of planes and satellites per plane), its validity window and an
//! opaque sensor configuration. It exclusively owns the satellites of the
//! constellation, each with its slot in the shell and its orbital elements.
//!
//! ## Architecture
//!
//! - [`api`]: Identifiers and record types shared by every layer
//! - [`models`]: Typed ingestion document, parsing and field validation
//! - [`db`]: Repository traits, Postgres and in-memory stores, configuration
//! - [`services`]: `IngestionPipeline` (atomic bulk import) and `QueryService`
//!
//! ## Example
//!
//! ```no_run
//! use constellation_store::db::RepositoryFactory;
//! use constellation_store::services::{IngestionPipeline, QueryService};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let repo = RepositoryFactory::from_env().await?;
//! let summary = IngestionPipeline::new(repo.clone())
//!     .import_file("starlink_shell1.json")
//!     .await?;
//! let satellites = QueryService::new(repo)
//!     .get_satellites_of_scenario(summary.scenario_id)
//!     .await?;
//! assert_eq!(satellites.len(), summary.satellites_count);
//! # Ok(())
//! # }
//! ```

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod api;

pub mod db;
pub mod models;

pub mod services;
