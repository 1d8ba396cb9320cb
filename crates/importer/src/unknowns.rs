//! Placeholders for reference strings nothing in scope declares.
//!
//! One registry is shared by every worker of a stage-two pass. The map stays
//! locked from the membership check until the placeholder row is written, so
//! concurrent callers asking for the same reference string always end up with
//! the same entity.

use javagraph_core::entities::{ArtifactId, ArtifactKind, EntityId, EntityKind};
use javagraph_core::{Error, Result};
use javagraph_storage::{LockSet, StoreSession, Table};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, trace};

pub struct UnknownsRegistry {
    artifact: ArtifactId,
    entries: Mutex<HashMap<String, EntityId>>,
}

impl UnknownsRegistry {
    /// Empty registry whose placeholders are owned by `artifact`
    pub fn new(artifact: ArtifactId) -> Self {
        Self {
            artifact,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Find the UNKNOWNS artifact created by database initialization
    pub async fn unknowns_artifact(session: &mut dyn StoreSession) -> Result<ArtifactId> {
        session
            .artifacts_by_kind(ArtifactKind::Unknowns)
            .await?
            .into_iter()
            .next()
            .map(|artifact| artifact.id)
            .ok_or_else(|| {
                Error::import("store has no UNKNOWNS artifact, run initialize-db first")
            })
    }

    /// Registry seeded with the placeholders earlier passes already stored
    pub async fn preload(session: &mut dyn StoreSession) -> Result<Self> {
        let artifact = Self::unknowns_artifact(session).await?;
        let entries: HashMap<String, EntityId> = session
            .entities_for_artifact(artifact)
            .await?
            .into_iter()
            .filter(|entity| entity.kind == EntityKind::Unknown)
            .map(|entity| (entity.fqn, entity.id))
            .collect();
        debug!(count = entries.len(), "Preloaded unknown references");
        Ok(Self {
            artifact,
            entries: Mutex::new(entries),
        })
    }

    /// Artifact that owns every placeholder
    pub fn artifact(&self) -> ArtifactId {
        self.artifact
    }

    pub async fn contains(&self, fqn: &str) -> bool {
        self.entries.lock().await.contains_key(fqn)
    }

    /// Number of placeholders known to this pass
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    #[cfg(test)]
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Placeholder for `fqn`, created on first request.
    ///
    /// The session must not have a lock scope open: creating a placeholder
    /// opens its own scope on the entities table.
    pub async fn get_or_create(
        &self,
        session: &mut dyn StoreSession,
        fqn: &str,
    ) -> Result<EntityId> {
        let mut entries = self.entries.lock().await;
        if let Some(id) = entries.get(fqn) {
            return Ok(*id);
        }

        session
            .lock_tables(&LockSet::new().write(Table::Entities))
            .await?;
        // Another process may have stored it since this registry was loaded
        let created = match session.find_entity_by_ref(fqn, self.artifact).await {
            Ok(Some(id)) => Ok(id),
            Ok(None) => {
                session
                    .create_entity(self.artifact, EntityKind::Unknown, fqn, None)
                    .await
            }
            Err(e) => Err(e),
        };
        let id = match created {
            Ok(id) => {
                session.unlock_tables().await?;
                id
            }
            Err(e) => {
                session.rollback_tables().await?;
                return Err(e);
            }
        };

        trace!(fqn, "Created unknown placeholder");
        entries.insert(fqn.to_string(), id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use javagraph_core::entities::{ArtifactRecord, StageMarker};
    use javagraph_storage::{GraphStore, MemoryStore};
    use std::sync::Arc;

    async fn store_with_unknowns() -> (MemoryStore, ArtifactId) {
        let store = MemoryStore::new();
        let mut session = store.open_session().await.unwrap();
        let unknowns = ArtifactRecord::new("unknowns", ArtifactKind::Unknowns)
            .with_stage(StageMarker::StageTwoDone);
        session
            .lock_tables(&LockSet::new().write(Table::Artifacts))
            .await
            .unwrap();
        session.insert_artifact(&unknowns).await.unwrap();
        session.unlock_tables().await.unwrap();
        (store, unknowns.id)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_placeholder() {
        let (store, unknowns) = store_with_unknowns().await;
        let registry = Arc::new(UnknownsRegistry::new(unknowns));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let registry = Arc::clone(&registry);
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let mut session = store.open_session().await.unwrap();
                registry
                    .get_or_create(session.as_mut(), "com.missing.Type")
                    .await
                    .unwrap()
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(store.entities_named("com.missing.Type").len(), 1);
        assert!(registry.contains("com.missing.Type").await);
    }

    #[tokio::test]
    async fn test_preload_reuses_stored_placeholders() {
        let (store, unknowns) = store_with_unknowns().await;
        let mut session = store.open_session().await.unwrap();

        let first = UnknownsRegistry::preload(session.as_mut()).await.unwrap();
        assert_eq!(first.artifact(), unknowns);
        assert!(first.is_empty().await);
        let id = first
            .get_or_create(session.as_mut(), "a.Missing")
            .await
            .unwrap();

        let second = UnknownsRegistry::preload(session.as_mut()).await.unwrap();
        assert_eq!(second.len().await, 1);
        assert_eq!(
            second
                .get_or_create(session.as_mut(), "a.Missing")
                .await
                .unwrap(),
            id
        );
        assert_eq!(store.entities_named("a.Missing").len(), 1);
    }

    #[tokio::test]
    async fn test_preload_requires_initialized_store() {
        let store = MemoryStore::new();
        let mut session = store.open_session().await.unwrap();
        let err = UnknownsRegistry::preload(session.as_mut()).await.err().unwrap();
        assert!(err.to_string().contains("initialize-db"));
    }
}
