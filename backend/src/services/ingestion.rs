//! Transactional bulk ingestion of constellation documents.
//!
//! An import either stores a scenario together with every satellite of the
//! document or stores nothing. The document is parsed and fully validated
//! before the repository is touched; the repository then writes the scenario
//! and its satellites as one transaction.

use std::path::Path;
use std::sync::Arc;

use log::{info, warn};
use serde_json::Value;

use crate::api::ImportSummary;
use crate::db::repository::{FullRepository, RepositoryError, RepositoryResult};
use crate::db::{RepositoryConfig, RepositoryFactory};
use crate::models::document::{
    parse_document_file, parse_document_str, parse_document_value, ScenarioDocument,
};
use crate::models::validation::validate_document;

const OPERATION: &str = "import_scenario";

/// Imports constellation documents into a repository.
///
/// # Example
/// ```no_run
/// use constellation_store::db::RepositoryFactory;
/// use constellation_store::services::IngestionPipeline;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pipeline = IngestionPipeline::new(RepositoryFactory::create_local());
///     let summary = pipeline.import_file("starlink_shell1.json").await?;
///     println!("scenario {} ({} satellites)", summary.scenario_id, summary.satellites_count);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct IngestionPipeline {
    repo: Arc<dyn FullRepository>,
}

impl IngestionPipeline {
    pub fn new(repo: Arc<dyn FullRepository>) -> Self {
        Self { repo }
    }

    /// Build a pipeline over the repository described by `config`.
    pub async fn from_config(config: &RepositoryConfig) -> RepositoryResult<Self> {
        let repo = RepositoryFactory::from_repository_config(config).await?;
        Ok(Self::new(repo))
    }

    pub fn repository(&self) -> &Arc<dyn FullRepository> {
        &self.repo
    }

    /// Import an already parsed document.
    ///
    /// # Errors
    /// * `ValidationError` - A field is out of range; nothing is stored
    /// * `ConstraintViolation` - A `satId` repeats; nothing is stored
    /// * `ConnectivityError` - The store failed or aborted; nothing is stored
    pub async fn import_document(
        &self,
        document: &ScenarioDocument,
    ) -> RepositoryResult<ImportSummary> {
        info!(
            "Importing scenario '{}' ({} satellites in document)",
            document.meta.scenario,
            document.satellites.len()
        );

        let validated = validate_document(document).map_err(|e| {
            warn!("Rejected scenario '{}': {}", document.meta.scenario, e);
            e.with_operation(OPERATION)
        })?;
        info!(
            "Validated scenario '{}': {} satellites",
            validated.scenario.name,
            validated.satellites.len()
        );

        match self
            .repo
            .store_scenario_with_satellites(&validated.scenario, &validated.satellites)
            .await
        {
            Ok(summary) => {
                info!(
                    "Imported scenario {} ('{}') with {} satellites",
                    summary.scenario_id, validated.scenario.name, summary.satellites_count
                );
                Ok(summary)
            }
            Err(e) => {
                warn!(
                    "Import of scenario '{}' rolled back: {}",
                    validated.scenario.name, e
                );
                Err(e.with_operation(OPERATION))
            }
        }
    }

    /// Parse and import a decoded JSON value.
    pub async fn import_value(&self, value: Value) -> RepositoryResult<ImportSummary> {
        let document = parse_document_value(value).map_err(reject)?;
        self.import_document(&document).await
    }

    /// Parse and import a JSON document held in memory.
    pub async fn import_str(&self, json: &str) -> RepositoryResult<ImportSummary> {
        let document = parse_document_str(json).map_err(reject)?;
        self.import_document(&document).await
    }

    /// Read, parse and import a JSON document from disk.
    pub async fn import_file(&self, path: impl AsRef<Path>) -> RepositoryResult<ImportSummary> {
        let path = path.as_ref();
        info!("Reading scenario document {}", path.display());
        let owned = path.to_path_buf();
        let document = tokio::task::spawn_blocking(move || parse_document_file(&owned))
            .await
            .map_err(|e| {
                RepositoryError::internal(format!("Task join error: {}", e))
                    .with_operation(OPERATION)
            })?
            .map_err(reject)?;
        self.import_document(&document).await
    }
}

fn reject(err: RepositoryError) -> RepositoryError {
    warn!("Rejected document: {}", err);
    err.with_operation(OPERATION)
}
