//! In-memory graph store.
//!
//! Rows live behind a single mutex that is only held for the duration of one
//! call. Coordination between workers goes through the table locks, exactly
//! as it does for the Postgres backend.

use async_trait::async_trait;
use javagraph_core::entities::{
    ArtifactDependency, ArtifactId, ArtifactKind, ArtifactRecord, CommentRecord, EntityId,
    EntityKind, EntityRecord, FileRecord, ImportRecord, Location, ProblemRecord, RelationRecord,
    StageMarker,
};
use javagraph_core::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use crate::error::StorageError;
use crate::locks::{LockSet, Table, TableGuard, TableLocks};
use crate::{GraphStore, StoreSession};

#[derive(Debug, Default)]
struct MemoryData {
    artifacts: HashMap<ArtifactId, ArtifactRecord>,
    dependencies: Vec<ArtifactDependency>,
    files: Vec<FileRecord>,
    problems: Vec<ProblemRecord>,
    entities: HashMap<EntityId, EntityRecord>,
    /// fqn -> ids in insertion order
    entities_by_fqn: HashMap<String, Vec<EntityId>>,
    relations: Vec<RelationRecord>,
    imports: Vec<ImportRecord>,
    comments: Vec<CommentRecord>,
}

impl MemoryData {
    fn insert_entity(&mut self, entity: EntityRecord) {
        self.entities_by_fqn
            .entry(entity.fqn.clone())
            .or_default()
            .push(entity.id);
        self.entities.insert(entity.id, entity);
    }

    fn remove_entities_where(&mut self, predicate: impl Fn(&EntityRecord) -> bool) {
        let removed: Vec<EntityId> = self
            .entities
            .values()
            .filter(|e| predicate(e))
            .map(|e| e.id)
            .collect();
        for id in removed {
            if let Some(entity) = self.entities.remove(&id) {
                if let Some(ids) = self.entities_by_fqn.get_mut(&entity.fqn) {
                    ids.retain(|other| *other != id);
                    if ids.is_empty() {
                        self.entities_by_fqn.remove(&entity.fqn);
                    }
                }
            }
        }
    }
}

/// Graph store kept entirely in process memory
#[derive(Clone)]
pub struct MemoryStore {
    data: Arc<Mutex<MemoryData>>,
    locks: Arc<TableLocks>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            data: Arc::new(Mutex::new(MemoryData::default())),
            locks: Arc::new(TableLocks::new()),
        }
    }

    /// Total number of stored entities
    pub fn entity_count(&self) -> usize {
        self.data.lock().map(|d| d.entities.len()).unwrap_or(0)
    }

    /// Total number of stored relations
    pub fn relation_count(&self) -> usize {
        self.data.lock().map(|d| d.relations.len()).unwrap_or(0)
    }

    /// Every stored entity with the given reference string
    pub fn entities_named(&self, fqn: &str) -> Vec<EntityRecord> {
        let Ok(data) = self.data.lock() else {
            return Vec::new();
        };
        data.entities_by_fqn
            .get(fqn)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| data.entities.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl GraphStore for MemoryStore {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        let mut data = lock_data(&self.data)?;
        *data = MemoryData::default();
        debug!("In-memory store reset");
        Ok(())
    }

    async fn open_session(&self) -> Result<Box<dyn StoreSession>> {
        Ok(Box::new(MemorySession {
            data: Arc::clone(&self.data),
            locks: Arc::clone(&self.locks),
            held: LockSet::new(),
            guards: Vec::new(),
        }))
    }
}

fn lock_data(data: &Mutex<MemoryData>) -> Result<MutexGuard<'_, MemoryData>> {
    data.lock()
        .map_err(|e| Error::from(StorageError::Poisoned(e.to_string())))
}

/// Session over a [`MemoryStore`]
pub struct MemorySession {
    data: Arc<Mutex<MemoryData>>,
    locks: Arc<TableLocks>,
    held: LockSet,
    guards: Vec<TableGuard>,
}

impl MemorySession {
    fn data(&self) -> Result<MutexGuard<'_, MemoryData>> {
        lock_data(&self.data)
    }

    fn release(&mut self) {
        self.guards.clear();
        self.held = LockSet::new();
    }
}

#[async_trait]
impl StoreSession for MemorySession {
    async fn lock_tables(&mut self, locks: &LockSet) -> Result<()> {
        if !self.held.is_empty() {
            return Err(Error::lock("a lock scope is already open on this session"));
        }
        self.guards = self.locks.acquire(locks).await?;
        self.held = locks.clone();
        Ok(())
    }

    async fn unlock_tables(&mut self) -> Result<()> {
        self.release();
        Ok(())
    }

    async fn rollback_tables(&mut self) -> Result<()> {
        self.release();
        Ok(())
    }

    async fn insert_artifact(&mut self, artifact: &ArtifactRecord) -> Result<()> {
        self.held.ensure_write(Table::Artifacts)?;
        let mut data = self.data()?;
        if data.artifacts.contains_key(&artifact.id) {
            return Err(Error::storage(format!(
                "artifact {} already exists",
                artifact.id
            )));
        }
        data.artifacts.insert(artifact.id, artifact.clone());
        Ok(())
    }

    async fn get_artifact(&mut self, id: ArtifactId) -> Result<Option<ArtifactRecord>> {
        Ok(self.data()?.artifacts.get(&id).cloned())
    }

    async fn find_artifact_by_hash(&mut self, hash: &str) -> Result<Option<ArtifactRecord>> {
        Ok(self
            .data()?
            .artifacts
            .values()
            .find(|a| a.hash.as_deref() == Some(hash))
            .cloned())
    }

    async fn find_artifact_by_path(&mut self, path: &str) -> Result<Option<ArtifactRecord>> {
        Ok(self
            .data()?
            .artifacts
            .values()
            .find(|a| a.path.as_deref() == Some(path))
            .cloned())
    }

    async fn artifacts_by_kind(&mut self, kind: ArtifactKind) -> Result<Vec<ArtifactRecord>> {
        let mut artifacts: Vec<ArtifactRecord> = self
            .data()?
            .artifacts
            .values()
            .filter(|a| a.kind == kind)
            .cloned()
            .collect();
        artifacts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(artifacts)
    }

    async fn mark_artifact_stage(&mut self, id: ArtifactId, stage: StageMarker) -> Result<()> {
        self.held.ensure_write(Table::Artifacts)?;
        let mut data = self.data()?;
        let artifact = data
            .artifacts
            .get_mut(&id)
            .ok_or_else(|| Error::storage(format!("artifact {id} not found")))?;
        artifact.stage = stage;
        Ok(())
    }

    async fn delete_artifact(&mut self, id: ArtifactId) -> Result<()> {
        for table in [
            Table::Artifacts,
            Table::ArtifactDependencies,
            Table::Files,
            Table::Problems,
            Table::Entities,
            Table::Relations,
            Table::Imports,
            Table::Comments,
        ] {
            self.held.ensure_write(table)?;
        }
        let mut data = self.data()?;
        data.artifacts.remove(&id);
        data.dependencies.retain(|d| d.artifact != id);
        data.files.retain(|f| f.artifact != id);
        data.problems.retain(|p| p.artifact != id);
        data.remove_entities_where(|e| e.artifact == id);
        data.relations.retain(|r| r.artifact != id);
        data.imports.retain(|i| i.artifact != id);
        data.comments.retain(|c| c.artifact != id);
        Ok(())
    }

    async fn reset_stage_two(&mut self, id: ArtifactId) -> Result<()> {
        for table in [
            Table::Entities,
            Table::Relations,
            Table::Imports,
            Table::Comments,
        ] {
            self.held.ensure_write(table)?;
        }
        let mut data = self.data()?;
        data.remove_entities_where(|e| e.artifact == id && e.kind.is_synthetic());
        data.relations.retain(|r| r.artifact != id);
        data.imports.retain(|i| i.artifact != id);
        data.comments.retain(|c| c.artifact != id);
        Ok(())
    }

    async fn insert_artifact_dependencies(&mut self, deps: &[ArtifactDependency]) -> Result<()> {
        self.held.ensure_write(Table::ArtifactDependencies)?;
        let mut data = self.data()?;
        for dep in deps {
            if !data.dependencies.contains(dep) {
                data.dependencies.push(*dep);
            }
        }
        Ok(())
    }

    async fn artifact_dependencies(&mut self, id: ArtifactId) -> Result<Vec<ArtifactId>> {
        Ok(self
            .data()?
            .dependencies
            .iter()
            .filter(|d| d.artifact == id)
            .map(|d| d.dependency)
            .collect())
    }

    async fn batch_insert_files(&mut self, files: &[FileRecord]) -> Result<()> {
        self.held.ensure_write(Table::Files)?;
        self.data()?.files.extend_from_slice(files);
        Ok(())
    }

    async fn files_for_artifact(&mut self, id: ArtifactId) -> Result<Vec<FileRecord>> {
        Ok(self
            .data()?
            .files
            .iter()
            .filter(|f| f.artifact == id)
            .cloned()
            .collect())
    }

    async fn batch_insert_problems(&mut self, problems: &[ProblemRecord]) -> Result<()> {
        self.held.ensure_write(Table::Problems)?;
        self.data()?.problems.extend_from_slice(problems);
        Ok(())
    }

    async fn problems_for_artifact(&mut self, id: ArtifactId) -> Result<Vec<ProblemRecord>> {
        Ok(self
            .data()?
            .problems
            .iter()
            .filter(|p| p.artifact == id)
            .cloned()
            .collect())
    }

    async fn create_entity(
        &mut self,
        artifact: ArtifactId,
        kind: EntityKind,
        fqn: &str,
        location: Option<Location>,
    ) -> Result<EntityId> {
        self.held.ensure_write(Table::Entities)?;
        let mut entity = EntityRecord::new(artifact, kind, fqn);
        entity.location = location;
        let id = entity.id;
        self.data()?.insert_entity(entity);
        Ok(id)
    }

    async fn batch_insert_entities(&mut self, entities: &[EntityRecord]) -> Result<()> {
        self.held.ensure_write(Table::Entities)?;
        let mut data = self.data()?;
        for entity in entities {
            if data.entities.contains_key(&entity.id) {
                return Err(Error::storage(format!(
                    "entity {} already exists",
                    entity.id
                )));
            }
            data.insert_entity(entity.clone());
        }
        Ok(())
    }

    async fn entities_for_artifact(&mut self, id: ArtifactId) -> Result<Vec<EntityRecord>> {
        Ok(self
            .data()?
            .entities
            .values()
            .filter(|e| e.artifact == id)
            .cloned()
            .collect())
    }

    async fn find_entity_by_ref(
        &mut self,
        fqn: &str,
        artifact: ArtifactId,
    ) -> Result<Option<EntityId>> {
        let data = self.data()?;
        Ok(data.entities_by_fqn.get(fqn).and_then(|ids| {
            ids.iter()
                .copied()
                .find(|id| data.entities.get(id).map(|e| e.artifact) == Some(artifact))
        }))
    }

    async fn find_entities_by_ref(
        &mut self,
        fqn: &str,
        artifacts: &[ArtifactId],
    ) -> Result<Vec<EntityRecord>> {
        let data = self.data()?;
        Ok(data
            .entities_by_fqn
            .get(fqn)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| data.entities.get(id))
                    .filter(|e| e.kind.is_declared() && artifacts.contains(&e.artifact))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn batch_insert_relations(&mut self, relations: &[RelationRecord]) -> Result<()> {
        self.held.ensure_write(Table::Relations)?;
        self.data()?.relations.extend_from_slice(relations);
        Ok(())
    }

    async fn relations_for_artifact(&mut self, id: ArtifactId) -> Result<Vec<RelationRecord>> {
        Ok(self
            .data()?
            .relations
            .iter()
            .filter(|r| r.artifact == id)
            .cloned()
            .collect())
    }

    async fn batch_insert_imports(&mut self, imports: &[ImportRecord]) -> Result<()> {
        self.held.ensure_write(Table::Imports)?;
        self.data()?.imports.extend_from_slice(imports);
        Ok(())
    }

    async fn imports_for_artifact(&mut self, id: ArtifactId) -> Result<Vec<ImportRecord>> {
        Ok(self
            .data()?
            .imports
            .iter()
            .filter(|i| i.artifact == id)
            .cloned()
            .collect())
    }

    async fn batch_insert_comments(&mut self, comments: &[CommentRecord]) -> Result<()> {
        self.held.ensure_write(Table::Comments)?;
        self.data()?.comments.extend_from_slice(comments);
        Ok(())
    }

    async fn comments_for_artifact(&mut self, id: ArtifactId) -> Result<Vec<CommentRecord>> {
        Ok(self
            .data()?
            .comments
            .iter()
            .filter(|c| c.artifact == id)
            .cloned()
            .collect())
    }
}
