//! Java code graph importer
//!
//! Turns extracted per-artifact fact streams into one cross-referenced entity
//! graph. Every artifact goes through two stages:
//!
//! 1. **Stage one** stores the artifact, its files, problems and every
//!    declared entity.
//! 2. **Stage two** resolves every reference the artifact makes, creating
//!    synthetic entities (arrays, wildcards, type variables, parameterized
//!    types, duplicates, unknowns) on demand, and stores all relations.
//!
//! The [`ImportCoordinator`] runs both stages over a set of artifacts with a
//! pool of workers, finishing stage one everywhere before stage two starts.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

pub mod coordinator;
pub mod initializer;
pub mod pipeline;
pub mod report;
pub mod repository;
pub mod resolver;
pub mod unknowns;

pub use coordinator::ImportCoordinator;
pub use initializer::initialize_database;
pub use pipeline::ImportPipeline;
pub use report::{
    ArtifactOutcome, ArtifactReport, ImportIssue, ImportReport, ImportStage, IssueKind,
    StageReport,
};
pub use repository::{discover_artifacts, ArtifactGroup};
pub use resolver::{EntityRef, EntityResolver, ResolutionContext};
pub use unknowns::UnknownsRegistry;

pub use javagraph_core::error::{Error, Result};

use javagraph_core::Config;
use javagraph_storage::GraphStore;
use std::sync::Arc;
use tracing::info;

/// Import one group of the configured extracted repository
///
/// # Errors
///
/// Returns an error if the group cannot be listed or the store was never
/// initialized. Failures of individual artifacts are part of the report.
pub async fn import_group(
    config: &Config,
    store: Arc<dyn GraphStore>,
    group: ArtifactGroup,
) -> Result<ImportReport> {
    let artifacts = discover_artifacts(&config.repository.input_path, group)?;
    info!(
        group = %group,
        artifacts = artifacts.len(),
        threads = config.importer.thread_count,
        "Importing artifacts"
    );
    ImportCoordinator::new(store, config.importer.clone())
        .run(artifacts)
        .await
}
