//! Fresh database setup

use javagraph_core::entities::{
    ArtifactKind, ArtifactRecord, EntityKind, EntityRecord, StageMarker, PRIMITIVE_TYPES,
};
use javagraph_core::Result;
use javagraph_storage::{GraphStore, LockSet, Table};
use tracing::info;

const PRIMITIVES_NAME: &str = "primitives";
const UNKNOWNS_NAME: &str = "unknowns";

/// Wipe the store and create the two built-in artifacts.
///
/// PRIMITIVES owns one PRIMITIVE entity per Java primitive type and UNKNOWNS
/// owns every placeholder created by later imports. Both are marked
/// STAGE_TWO_DONE so no import ever touches them again.
pub async fn initialize_database(store: &dyn GraphStore) -> Result<()> {
    store.initialize().await?;
    store.reset().await?;

    let primitives = ArtifactRecord::new(PRIMITIVES_NAME, ArtifactKind::Primitives)
        .with_path(PRIMITIVES_NAME)
        .with_stage(StageMarker::StageTwoDone);
    let unknowns = ArtifactRecord::new(UNKNOWNS_NAME, ArtifactKind::Unknowns)
        .with_path(UNKNOWNS_NAME)
        .with_stage(StageMarker::StageTwoDone);
    let entities: Vec<EntityRecord> = PRIMITIVE_TYPES
        .iter()
        .map(|name| EntityRecord::new(primitives.id, EntityKind::Primitive, *name))
        .collect();

    let mut session = store.open_session().await?;
    session
        .lock_tables(&LockSet::new().write(Table::Artifacts).write(Table::Entities))
        .await?;
    let written = async {
        session.insert_artifact(&primitives).await?;
        session.insert_artifact(&unknowns).await?;
        session.batch_insert_entities(&entities).await
    }
    .await;
    match written {
        Ok(()) => session.unlock_tables().await?,
        Err(e) => {
            session.rollback_tables().await?;
            return Err(e);
        }
    }

    info!(primitives = entities.len(), "Initialized database");
    Ok(())
}
