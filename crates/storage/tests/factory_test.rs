use javagraph_core::config::StorageConfig;
use javagraph_core::entities::{ArtifactKind, ArtifactRecord, StageMarker};
use javagraph_storage::{create_and_initialize_store, create_store, LockSet, Table};

#[tokio::test]
async fn test_factory_creates_memory_store() {
    let config = StorageConfig::default();
    let store = create_and_initialize_store(&config).await.unwrap();

    let mut session = store.open_session().await.unwrap();
    let artifact = ArtifactRecord::new("rt", ArtifactKind::JavaLibrary).with_path("libraries/rt");

    session
        .lock_tables(&LockSet::new().write(Table::Artifacts))
        .await
        .unwrap();
    session.insert_artifact(&artifact).await.unwrap();
    session
        .mark_artifact_stage(artifact.id, StageMarker::StageOneDone)
        .await
        .unwrap();
    session.unlock_tables().await.unwrap();

    // A second session observes the same rows
    let mut other = store.open_session().await.unwrap();
    let found = other
        .find_artifact_by_path("libraries/rt")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.stage, StageMarker::StageOneDone);
    assert_eq!(
        other
            .artifacts_by_kind(ArtifactKind::JavaLibrary)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_factory_rejects_unknown_provider() {
    let config = StorageConfig {
        provider: "neo4j".to_string(),
        ..Default::default()
    };
    let err = create_store(&config).await.err().unwrap();
    assert!(err.to_string().contains("neo4j"));
}
