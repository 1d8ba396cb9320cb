//! Per-artifact two-stage import.
//!
//! Each stage reads the artifact's fact streams, builds every row it is
//! going to write in memory and then writes them in a single lock scope
//! covering exactly the tables that stage touches. The stage marker is set
//! inside the same scope, so a marker is never visible before the rows it
//! vouches for.

mod batches;
mod stage_one;
mod stage_two;

use javagraph_core::entities::{ArtifactId, ArtifactRecord, EntityId, FileId, FileRecord, Location};
use javagraph_core::facts::{ArtifactDescriptor, FactSource, SourceSpan};
use javagraph_core::{Error, ImporterConfig, Result};
use javagraph_storage::{LockSet, StoreSession, Table};
use std::collections::HashMap;
use strum::IntoEnumIterator;
use tracing::{error, warn};

use crate::report::{ArtifactReport, ImportIssue, IssueKind};
use crate::unknowns::UnknownsRegistry;

/// Runs the import stages for one worker, on the worker's own session
pub struct ImportPipeline {
    session: Box<dyn StoreSession>,
    options: ImporterConfig,
}

impl ImportPipeline {
    pub fn new(session: Box<dyn StoreSession>, options: ImporterConfig) -> Self {
        Self { session, options }
    }

    /// Store the artifact, its files, problems and declared entities.
    ///
    /// Skipped when the artifact already finished stage one. An artifact left
    /// at NOT_STARTED by an interrupted run is deleted and imported again.
    pub async fn stage_one(&mut self, facts: &dyn FactSource) -> Result<ArtifactReport> {
        stage_one::run(self.session.as_mut(), facts, &self.options).await
    }

    /// Resolve the artifact's references and store its relations, imports
    /// and comments. Requires stage one to have completed.
    pub async fn stage_two(
        &mut self,
        facts: &dyn FactSource,
        unknowns: &UnknownsRegistry,
    ) -> Result<ArtifactReport> {
        stage_two::run(self.session.as_mut(), facts, unknowns, &self.options).await
    }

    pub fn session(&mut self) -> &mut dyn StoreSession {
        self.session.as_mut()
    }
}

/// Repository path of an artifact, falling back to its name
pub(crate) fn artifact_path(descriptor: &ArtifactDescriptor) -> String {
    descriptor
        .path
        .clone()
        .unwrap_or_else(|| descriptor.name.clone())
}

/// Key the store identifies an artifact by: jars by content hash, the rest
/// by path
pub(crate) fn identity_key(descriptor: &ArtifactDescriptor) -> String {
    match (descriptor.kind.is_hashed(), descriptor.hash.as_deref()) {
        (true, Some(hash)) => format!("hash:{hash}"),
        _ => format!("path:{}", artifact_path(descriptor)),
    }
}

/// Stored record for the artifact: jars by content hash, the rest by path
pub(crate) async fn find_existing(
    session: &mut dyn StoreSession,
    descriptor: &ArtifactDescriptor,
) -> Result<Option<ArtifactRecord>> {
    match (descriptor.kind.is_hashed(), descriptor.hash.as_deref()) {
        (true, Some(hash)) => session.find_artifact_by_hash(hash).await,
        _ => session.find_artifact_by_path(&artifact_path(descriptor)).await,
    }
}

/// Id of the `ordinal`-th local variable fact; both stages derive it the
/// same way
pub(crate) fn local_id(artifact: ArtifactId, fqn: &str, ordinal: usize) -> EntityId {
    EntityId::derived(artifact, &format!("{fqn}@{ordinal}"))
}

/// Write lock on every table
pub(crate) fn all_tables() -> LockSet {
    Table::iter().fold(LockSet::new(), LockSet::write)
}

/// Close a lock scope, keeping its writes only if `outcome` is a success
pub(crate) async fn close_scope<T>(
    session: &mut dyn StoreSession,
    outcome: Result<T>,
) -> Result<T> {
    match outcome {
        Ok(value) => {
            session.unlock_tables().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = session.rollback_tables().await {
                error!("Failed to roll back lock scope: {rollback}");
            }
            Err(e)
        }
    }
}

/// File-relative path to file id for one artifact
#[derive(Debug, Default)]
pub(crate) struct FileIndex {
    ids: HashMap<String, FileId>,
}

impl FileIndex {
    pub(crate) fn from_records<'r>(records: impl IntoIterator<Item = &'r FileRecord>) -> Self {
        let mut index = Self::default();
        for record in records {
            index.insert(record);
        }
        index
    }

    /// Returns false if the path was already present
    pub(crate) fn insert(&mut self, record: &FileRecord) -> bool {
        if self.ids.contains_key(&record.path) {
            return false;
        }
        self.ids.insert(record.path.clone(), record.id);
        true
    }

    pub(crate) fn file(&self, path: &str) -> Option<FileId> {
        self.ids.get(path).copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.ids.len()
    }

    /// Location of `span`, or `None` after reporting a missing file
    pub(crate) fn locate(
        &self,
        span: &SourceSpan,
        issues: &mut IssueLog,
        fact: &str,
    ) -> Result<Option<Location>> {
        match self.file(&span.path) {
            Some(file) => Ok(Some(Location {
                file,
                offset: span.offset,
                length: span.length,
            })),
            None => {
                issues.report(
                    IssueKind::MissingFile,
                    format!("{fact}: unknown file {}", span.path),
                )?;
                Ok(None)
            }
        }
    }
}

/// Collects dropped facts, or fails on the first reference failure when
/// strict references are enabled
pub(crate) struct IssueLog {
    artifact: String,
    strict: bool,
    issues: Vec<ImportIssue>,
}

impl IssueLog {
    pub(crate) fn new(artifact: impl Into<String>, strict: bool) -> Self {
        Self {
            artifact: artifact.into(),
            strict,
            issues: Vec::new(),
        }
    }

    pub(crate) fn report(&mut self, kind: IssueKind, detail: impl Into<String>) -> Result<()> {
        let detail = detail.into();
        if self.strict && kind.is_reference_failure() {
            return Err(Error::import(format!(
                "{}: {kind}: {detail}",
                self.artifact
            )));
        }
        if kind.is_reference_failure() {
            error!(artifact = %self.artifact, issue = %kind, "{detail}");
        } else {
            warn!(artifact = %self.artifact, issue = %kind, "{detail}");
        }
        self.issues.push(ImportIssue {
            artifact: self.artifact.clone(),
            kind,
            detail,
        });
        Ok(())
    }

    pub(crate) fn into_issues(self) -> Vec<ImportIssue> {
        self.issues
    }
}
