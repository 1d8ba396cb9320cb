//! Stage two: reference resolution, relations, imports and comments

use javagraph_core::entities::{
    ArtifactId, CommentKind, CommentRecord, EntityId, EntityKind, ImportRecord, RelationKind,
    StageMarker,
};
use javagraph_core::facts::FactSource;
use javagraph_core::{Error, ImporterConfig, Result};
use javagraph_storage::{LockSet, StoreSession, Table};
use std::collections::HashSet;
use tracing::{debug, info};

use super::batches::PendingWrites;
use super::{close_scope, find_existing, local_id, FileIndex, IssueLog};
use crate::report::{ArtifactReport, IssueKind};
use crate::resolver::{EntityRef, EntityResolver, ResolutionContext};
use crate::unknowns::UnknownsRegistry;

fn stage_two_tables() -> LockSet {
    LockSet::new()
        .write(Table::Entities)
        .write(Table::Relations)
        .write(Table::Imports)
        .write(Table::Comments)
}

async fn stage_two_done(session: &mut dyn StoreSession, artifact: ArtifactId) -> Result<bool> {
    Ok(session
        .get_artifact(artifact)
        .await?
        .is_some_and(|record| record.stage == StageMarker::StageTwoDone))
}

pub(super) async fn run(
    session: &mut dyn StoreSession,
    facts: &dyn FactSource,
    unknowns: &UnknownsRegistry,
    options: &ImporterConfig,
) -> Result<ArtifactReport> {
    let descriptor = facts.descriptor();
    let name = descriptor.name.clone();

    let artifact = match find_existing(session, descriptor).await? {
        Some(artifact) if artifact.stage == StageMarker::StageTwoDone => {
            debug!(artifact = %name, "Stage two already done");
            return Ok(ArtifactReport::skipped(name));
        }
        Some(artifact) if artifact.stage == StageMarker::StageOneDone => artifact,
        _ => {
            return Err(Error::import(format!(
                "{name} has not completed stage one"
            )))
        }
    };

    // Output of an interrupted earlier attempt. Another worker importing the
    // same jar may have finished in the meantime; its rows must survive.
    session
        .lock_tables(&stage_two_tables().read(Table::Artifacts))
        .await?;
    let outcome: Result<bool> = async {
        if stage_two_done(session, artifact.id).await? {
            return Ok(false);
        }
        session.reset_stage_two(artifact.id).await?;
        Ok(true)
    }
    .await;
    if !close_scope(session, outcome).await? {
        debug!(artifact = %name, "Stage two finished by another worker");
        return Ok(ArtifactReport::skipped(name));
    }

    let files = FileIndex::from_records(&session.files_for_artifact(artifact.id).await?);
    let stored = session.entities_for_artifact(artifact.id).await?;
    let locals: HashSet<EntityId> = stored
        .iter()
        .filter(|e| matches!(e.kind, EntityKind::LocalVariable | EntityKind::Parameter))
        .map(|e| e.id)
        .collect();
    let context = ResolutionContext::load(session, artifact.id, unknowns.artifact()).await?;
    let mut resolver = EntityResolver::new(context, unknowns).with_declared(stored);
    let mut issues = IssueLog::new(name.clone(), options.strict_references);

    for fact in facts.relations()? {
        let fact = fact?;
        let edge = format!("{} {} -> {}", fact.kind, fact.lhs, fact.rhs);
        let location = match fact.location.as_ref() {
            Some(span) => match files.locate(span, &mut issues, &edge)? {
                Some(location) => Some(location),
                None => continue,
            },
            None => None,
        };
        let Some(lhs) = resolver.find_declared(session, &fact.lhs).await? else {
            issues.report(
                IssueKind::DanglingEndpoint,
                format!("{edge}: {} is not declared", fact.lhs),
            )?;
            continue;
        };
        let rhs = resolver.resolve(session, &fact.rhs).await?;
        resolver.relate(fact.kind, lhs, rhs, location);
    }

    for (ordinal, fact) in facts.local_variables()?.enumerate() {
        let fact = fact?;
        let fqn = fact.fqn();
        let id = local_id(artifact.id, &fqn, ordinal);
        if !locals.contains(&id) {
            // Dropped in stage one
            continue;
        }
        let local = EntityRef {
            id,
            artifact: artifact.id,
            kind: fact.entity_kind(),
        };
        let holds = resolver.resolve(session, &fact.type_fqn).await?;
        resolver.relate(RelationKind::Holds, local, holds, None);
        match resolver.find_declared(session, &fact.parent).await? {
            Some(parent) => resolver.relate(RelationKind::Inside, local, parent, None),
            None => issues.report(
                IssueKind::DanglingEndpoint,
                format!("{fqn}: enclosing {} is not declared", fact.parent),
            )?,
        }
    }

    let mut imports = Vec::new();
    for fact in facts.imports()? {
        let fact = fact?;
        let Some(location) = files.locate(&fact.location, &mut issues, &fact.imported)? else {
            continue;
        };
        let imported = resolver.resolve(session, &fact.imported).await?;
        imports.push(ImportRecord {
            artifact: artifact.id,
            entity: imported.id,
            is_static: fact.is_static,
            on_demand: fact.on_demand,
            location,
        });
    }

    let mut comments = Vec::new();
    for fact in facts.comments()? {
        let fact = fact?;
        let what = format!("{} comment", fact.kind);
        let Some(location) = files.locate(&fact.location, &mut issues, &what)? else {
            continue;
        };
        let entity = match (fact.kind, fact.fqn.as_deref()) {
            (CommentKind::Javadoc, Some(fqn)) => {
                match resolver.find_declared(session, fqn).await? {
                    Some(entity) => Some(entity.id),
                    None => {
                        issues.report(
                            IssueKind::DanglingEndpoint,
                            format!("javadoc for {fqn}, which is not declared"),
                        )?;
                        continue;
                    }
                }
            }
            _ => None,
        };
        comments.push(CommentRecord {
            artifact: artifact.id,
            kind: fact.kind,
            entity,
            location,
        });
    }

    let (entities, relations) = resolver.into_staged();
    let writes = PendingWrites {
        entities,
        relations,
        imports,
        comments,
        ..Default::default()
    };

    session
        .lock_tables(&stage_two_tables().write(Table::Artifacts))
        .await?;
    let outcome: Result<bool> = async {
        if stage_two_done(session, artifact.id).await? {
            return Ok(false);
        }
        writes.flush(session, options.max_rows_per_batch).await?;
        session
            .mark_artifact_stage(artifact.id, StageMarker::StageTwoDone)
            .await?;
        Ok(true)
    }
    .await;
    if !close_scope(session, outcome).await? {
        debug!(artifact = %name, "Stage two finished by another worker");
        return Ok(ArtifactReport::skipped(name));
    }

    info!(
        artifact = %name,
        synthetic = writes.entities.len(),
        relations = writes.relations.len(),
        imports = writes.imports.len(),
        comments = writes.comments.len(),
        "Stage two complete"
    );
    let mut report = ArtifactReport::completed(name);
    report.entities = writes.entities.len();
    report.relations = writes.relations.len();
    report.issues = issues.into_issues();
    Ok(report)
}
