//! Services built on top of the repository layer.
//!
//! - [`ingestion`]: parse, validate and atomically store constellation documents
//! - [`query`]: read and mutate scenarios and satellites with validation
//!
//! Both services receive an already constructed repository, so the same code
//! runs against Postgres in production and the in-memory store in tests.

pub mod ingestion;
pub mod query;

pub use ingestion::IngestionPipeline;
pub use query::QueryService;
