//! Rows produced by a stage, written together in one lock scope

use javagraph_core::entities::{
    ArtifactDependency, CommentRecord, EntityRecord, FileRecord, ImportRecord, ProblemRecord,
    RelationRecord,
};
use javagraph_core::Result;
use javagraph_storage::StoreSession;
use tracing::debug;

#[derive(Debug, Default)]
pub(crate) struct PendingWrites {
    pub dependencies: Vec<ArtifactDependency>,
    pub files: Vec<FileRecord>,
    pub problems: Vec<ProblemRecord>,
    pub entities: Vec<EntityRecord>,
    pub relations: Vec<RelationRecord>,
    pub imports: Vec<ImportRecord>,
    pub comments: Vec<CommentRecord>,
}

impl PendingWrites {
    /// Write every row, at most `max_rows` per batch insert.
    ///
    /// Entities go before relations so no relation is written ahead of its
    /// endpoints. The caller must hold write locks on every non-empty table.
    pub(crate) async fn flush(&self, session: &mut dyn StoreSession, max_rows: usize) -> Result<()> {
        let rows = max_rows.max(1);
        for chunk in self.dependencies.chunks(rows) {
            session.insert_artifact_dependencies(chunk).await?;
        }
        for chunk in self.files.chunks(rows) {
            session.batch_insert_files(chunk).await?;
        }
        for chunk in self.problems.chunks(rows) {
            session.batch_insert_problems(chunk).await?;
        }
        for chunk in self.entities.chunks(rows) {
            session.batch_insert_entities(chunk).await?;
        }
        for chunk in self.relations.chunks(rows) {
            session.batch_insert_relations(chunk).await?;
        }
        for chunk in self.imports.chunks(rows) {
            session.batch_insert_imports(chunk).await?;
        }
        for chunk in self.comments.chunks(rows) {
            session.batch_insert_comments(chunk).await?;
        }
        debug!(
            files = self.files.len(),
            entities = self.entities.len(),
            relations = self.relations.len(),
            "Flushed pending writes"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use javagraph_core::entities::{ArtifactId, EntityKind};
    use javagraph_storage::{GraphStore, LockSet, MemoryStore, Table};

    #[tokio::test]
    async fn test_flush_splits_into_bounded_batches() {
        let store = MemoryStore::new();
        let mut session = store.open_session().await.unwrap();
        let artifact = ArtifactId::new();
        let writes = PendingWrites {
            entities: (0..7)
                .map(|i| EntityRecord::new(artifact, EntityKind::Class, format!("a.C{i}")))
                .collect(),
            ..Default::default()
        };

        session
            .lock_tables(&LockSet::new().write(Table::Entities))
            .await
            .unwrap();
        writes.flush(session.as_mut(), 3).await.unwrap();
        session.unlock_tables().await.unwrap();

        assert_eq!(store.entity_count(), 7);
    }

    #[tokio::test]
    async fn test_flush_needs_write_locks() {
        let store = MemoryStore::new();
        let mut session = store.open_session().await.unwrap();
        let writes = PendingWrites {
            entities: vec![EntityRecord::new(ArtifactId::new(), EntityKind::Class, "a.A")],
            ..Default::default()
        };
        assert!(writes.flush(session.as_mut(), 10).await.is_err());
        assert_eq!(store.entity_count(), 0);
    }
}
