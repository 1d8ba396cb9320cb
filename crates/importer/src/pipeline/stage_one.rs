//! Stage one: artifact, files, problems and declared entities

use javagraph_core::entities::{
    ArtifactDependency, ArtifactRecord, EntityRecord, FileId, FileRecord, ProblemRecord,
    StageMarker,
};
use javagraph_core::facts::FactSource;
use javagraph_core::{ImporterConfig, Result};
use javagraph_storage::{LockSet, StoreSession, Table};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use super::batches::PendingWrites;
use super::{all_tables, artifact_path, close_scope, find_existing, local_id, FileIndex, IssueLog};
use crate::report::{ArtifactReport, IssueKind};

fn stage_one_tables() -> LockSet {
    LockSet::new()
        .write(Table::Artifacts)
        .write(Table::ArtifactDependencies)
        .write(Table::Files)
        .write(Table::Problems)
        .write(Table::Entities)
}

pub(super) async fn run(
    session: &mut dyn StoreSession,
    facts: &dyn FactSource,
    options: &ImporterConfig,
) -> Result<ArtifactReport> {
    let descriptor = facts.descriptor();
    let name = descriptor.name.clone();

    match find_existing(session, descriptor).await? {
        Some(existing) if existing.stage >= StageMarker::StageOneDone => {
            debug!(artifact = %name, stage = %existing.stage, "Stage one already done");
            return Ok(ArtifactReport::skipped(name));
        }
        Some(partial) => {
            warn!(artifact = %name, "Deleting partially imported artifact");
            session.lock_tables(&all_tables()).await?;
            let outcome = session.delete_artifact(partial.id).await;
            close_scope(session, outcome).await?;
        }
        None => {}
    }

    let mut artifact =
        ArtifactRecord::new(name.clone(), descriptor.kind).with_path(artifact_path(descriptor));
    artifact.hash = descriptor.hash.clone();

    let mut issues = IssueLog::new(name.clone(), options.strict_references);
    let mut writes = PendingWrites::default();

    let mut files = FileIndex::default();
    for fact in facts.files()? {
        let fact = fact?;
        let record = FileRecord {
            id: FileId::new(),
            artifact: artifact.id,
            kind: fact.kind,
            path: fact.path,
        };
        if files.insert(&record) {
            writes.files.push(record);
        } else {
            debug!(artifact = %name, path = %record.path, "Ignoring repeated file");
        }
    }

    let mut declared = HashSet::new();
    for fact in facts.entities()? {
        let fact = fact?;
        if fact.kind.is_synthetic() {
            issues.report(
                IssueKind::UnsupportedFact,
                format!("{} cannot be declared as {}", fact.fqn, fact.kind),
            )?;
            continue;
        }
        if declared.contains(&fact.fqn) {
            issues.report(
                IssueKind::DuplicateDeclaration,
                format!("{} declared more than once, keeping the first", fact.fqn),
            )?;
            continue;
        }
        let location = match fact.location.as_ref() {
            Some(span) => match files.locate(span, &mut issues, &fact.fqn)? {
                Some(location) => Some(location),
                None => continue,
            },
            None => None,
        };
        let mut record = EntityRecord::new(artifact.id, fact.kind, fact.fqn.clone());
        record.modifiers = fact.modifiers;
        record.multiplicity = fact.multiplicity;
        record.location = location;
        declared.insert(fact.fqn);
        writes.entities.push(record);
    }
    let declarations = writes.entities.len();

    for (ordinal, fact) in facts.local_variables()?.enumerate() {
        let fact = fact?;
        let fqn = fact.fqn();
        let location = match fact.location.as_ref() {
            Some(span) => match files.locate(span, &mut issues, &fqn)? {
                Some(location) => Some(location),
                None => continue,
            },
            None => None,
        };
        let mut record = EntityRecord::new(artifact.id, fact.entity_kind(), fqn.as_str());
        record.id = local_id(artifact.id, &fqn, ordinal);
        record.modifiers = fact.modifiers;
        record.location = location;
        writes.entities.push(record);
    }

    for fact in facts.problems()? {
        let fact = fact?;
        let Some(file) = files.file(&fact.path) else {
            issues.report(
                IssueKind::MissingFile,
                format!("problem {}: unknown file {}", fact.error_code, fact.path),
            )?;
            continue;
        };
        writes.problems.push(ProblemRecord {
            artifact: artifact.id,
            file,
            kind: fact.kind,
            error_code: fact.error_code,
            message: fact.message,
        });
    }

    for fact in facts.used_jars()? {
        let fact = fact?;
        match session.find_artifact_by_hash(&fact.hash).await? {
            Some(jar) => {
                let dependency = ArtifactDependency {
                    artifact: artifact.id,
                    dependency: jar.id,
                };
                if !writes.dependencies.contains(&dependency) {
                    writes.dependencies.push(dependency);
                }
            }
            None => issues.report(
                IssueKind::MissingDependency,
                format!("used jar {} is not in the store", fact.hash),
            )?,
        }
    }

    session.lock_tables(&stage_one_tables()).await?;
    let outcome: Result<bool> = async {
        // Another worker may have imported the same jar from another location
        if find_existing(session, descriptor).await?.is_some() {
            return Ok(false);
        }
        session.insert_artifact(&artifact).await?;
        writes.flush(session, options.max_rows_per_batch).await?;
        session
            .mark_artifact_stage(artifact.id, StageMarker::StageOneDone)
            .await?;
        Ok(true)
    }
    .await;
    if !close_scope(session, outcome).await? {
        debug!(artifact = %name, "Imported concurrently by another worker");
        return Ok(ArtifactReport::skipped(name));
    }

    info!(
        artifact = %name,
        files = files.len(),
        declarations,
        locals = writes.entities.len() - declarations,
        problems = writes.problems.len(),
        dependencies = writes.dependencies.len(),
        "Stage one complete"
    );
    let mut report = ArtifactReport::completed(name);
    report.entities = writes.entities.len();
    report.issues = issues.into_issues();
    Ok(report)
}
