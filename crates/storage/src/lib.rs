#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

//! Persistence port for the javagraph importer.
//!
//! A [`GraphStore`] hands out independent [`StoreSession`]s, one per import
//! worker. Sessions share the store's tables, so every write happens inside a
//! lock scope opened with [`StoreSession::lock_tables`] that holds the written
//! tables in [`LockMode::Write`].

pub mod error;
mod factory;
mod locks;
mod memory;
mod postgres;

pub use error::StorageError;
pub use factory::{create_and_initialize_store, create_store};
pub use locks::{LockMode, LockSet, Table};
pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use javagraph_core::entities::{
    ArtifactDependency, ArtifactId, ArtifactKind, ArtifactRecord, CommentRecord, EntityId,
    EntityKind, EntityRecord, FileRecord, ImportRecord, Location, ProblemRecord, RelationRecord,
    StageMarker,
};
use javagraph_core::Result;

// ==== Traits ====

/// Shared graph store
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Create the schema if it does not exist yet
    async fn initialize(&self) -> Result<()>;

    /// Remove every row from every table
    async fn reset(&self) -> Result<()>;

    /// Open a session owned by a single worker
    async fn open_session(&self) -> Result<Box<dyn StoreSession>>;
}

/// One worker's connection to the store
#[async_trait]
pub trait StoreSession: Send {
    // ---- lock scope ----

    /// Open a lock scope over exactly the given tables
    async fn lock_tables(&mut self, locks: &LockSet) -> Result<()>;

    /// Close the lock scope, keeping everything written inside it
    async fn unlock_tables(&mut self) -> Result<()>;

    /// Close the lock scope after a failure. Backends with transactions
    /// discard the scope's writes; others keep them and rely on stage
    /// markers for recovery.
    async fn rollback_tables(&mut self) -> Result<()>;

    // ---- artifacts ----

    async fn insert_artifact(&mut self, artifact: &ArtifactRecord) -> Result<()>;

    async fn get_artifact(&mut self, id: ArtifactId) -> Result<Option<ArtifactRecord>>;

    async fn find_artifact_by_hash(&mut self, hash: &str) -> Result<Option<ArtifactRecord>>;

    async fn find_artifact_by_path(&mut self, path: &str) -> Result<Option<ArtifactRecord>>;

    async fn artifacts_by_kind(&mut self, kind: ArtifactKind) -> Result<Vec<ArtifactRecord>>;

    async fn mark_artifact_stage(&mut self, id: ArtifactId, stage: StageMarker) -> Result<()>;

    /// Delete the artifact and every row it owns
    async fn delete_artifact(&mut self, id: ArtifactId) -> Result<()>;

    /// Delete the rows stage two produces for the artifact: synthetic
    /// entities, relations, imports and comments
    async fn reset_stage_two(&mut self, id: ArtifactId) -> Result<()>;

    async fn insert_artifact_dependencies(&mut self, deps: &[ArtifactDependency]) -> Result<()>;

    /// Direct dependencies of an artifact
    async fn artifact_dependencies(&mut self, id: ArtifactId) -> Result<Vec<ArtifactId>>;

    // ---- files and problems ----

    async fn batch_insert_files(&mut self, files: &[FileRecord]) -> Result<()>;

    async fn files_for_artifact(&mut self, id: ArtifactId) -> Result<Vec<FileRecord>>;

    async fn batch_insert_problems(&mut self, problems: &[ProblemRecord]) -> Result<()>;

    async fn problems_for_artifact(&mut self, id: ArtifactId) -> Result<Vec<ProblemRecord>>;

    // ---- entities ----

    /// Insert a single entity and return its id
    async fn create_entity(
        &mut self,
        artifact: ArtifactId,
        kind: EntityKind,
        fqn: &str,
        location: Option<Location>,
    ) -> Result<EntityId>;

    async fn batch_insert_entities(&mut self, entities: &[EntityRecord]) -> Result<()>;

    async fn entities_for_artifact(&mut self, id: ArtifactId) -> Result<Vec<EntityRecord>>;

    /// Entity with this reference string owned by the artifact
    async fn find_entity_by_ref(&mut self, fqn: &str, artifact: ArtifactId)
        -> Result<Option<EntityId>>;

    /// Declared entities with this reference string owned by any of the
    /// given artifacts
    async fn find_entities_by_ref(
        &mut self,
        fqn: &str,
        artifacts: &[ArtifactId],
    ) -> Result<Vec<EntityRecord>>;

    // ---- relations, imports, comments ----

    async fn batch_insert_relations(&mut self, relations: &[RelationRecord]) -> Result<()>;

    async fn relations_for_artifact(&mut self, id: ArtifactId) -> Result<Vec<RelationRecord>>;

    async fn batch_insert_imports(&mut self, imports: &[ImportRecord]) -> Result<()>;

    async fn imports_for_artifact(&mut self, id: ArtifactId) -> Result<Vec<ImportRecord>>;

    async fn batch_insert_comments(&mut self, comments: &[CommentRecord]) -> Result<()>;

    async fn comments_for_artifact(&mut self, id: ArtifactId) -> Result<Vec<CommentRecord>>;
}
