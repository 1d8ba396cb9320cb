use async_trait::async_trait;
use javagraph_core::entities::{
    ArtifactDependency, ArtifactId, ArtifactKind, ArtifactRecord, CommentRecord, EntityId,
    EntityKind, EntityRecord, FileRecord, ImportRecord, Location, ProblemRecord, RelationRecord,
    StageMarker,
};
use javagraph_core::{Error, Result};
use sqlx::pool::PoolConnection;
use sqlx::{Postgres, QueryBuilder};
use tracing::{debug, warn};
use uuid::Uuid;

use super::rows::{
    convert, ArtifactRow, CommentRow, EntityRow, FileRow, ImportRow, ProblemRow, RelationRow,
};
use crate::locks::{LockMode, LockSet, Table};
use crate::StoreSession;

const ARTIFACT_COLUMNS: &str = "artifact_id, name, kind, path, hash, stage";
const ENTITY_COLUMNS: &str =
    "entity_id, artifact_id, kind, fqn, modifiers, multiplicity, file_id, start_offset, length";
const RELATION_COLUMNS: &str =
    "kind, class, lhs_id, rhs_id, artifact_id, file_id, start_offset, length";

/// Kinds a dependency lookup may return
fn declared_kinds() -> Vec<String> {
    use strum::IntoEnumIterator;
    EntityKind::iter()
        .filter(EntityKind::is_declared)
        .map(|kind| kind.to_string())
        .collect()
}

/// Kinds produced by stage two
fn synthetic_kinds() -> Vec<String> {
    use strum::IntoEnumIterator;
    EntityKind::iter()
        .filter(EntityKind::is_synthetic)
        .map(|kind| kind.to_string())
        .collect()
}

fn location_parts(location: Option<&Location>) -> (Option<Uuid>, Option<i32>, Option<i32>) {
    match location {
        Some(loc) => (Some(loc.file.as_uuid()), Some(loc.offset), Some(loc.length)),
        None => (None, None, None),
    }
}

/// Session over a dedicated pooled connection
pub struct PostgresSession {
    conn: PoolConnection<Postgres>,
    held: LockSet,
}

impl PostgresSession {
    pub(crate) fn new(conn: PoolConnection<Postgres>) -> Self {
        Self {
            conn,
            held: LockSet::new(),
        }
    }

    async fn execute_raw(&mut self, statement: &str) -> Result<()> {
        sqlx::query(statement)
            .execute(&mut *self.conn)
            .await
            .map_err(|e| Error::storage(format!("Failed to execute '{statement}': {e}")))?;
        Ok(())
    }

    async fn delete_owned(&mut self, table: Table, id: ArtifactId) -> Result<()> {
        let statement = format!("DELETE FROM {} WHERE artifact_id = $1", table.as_ref());
        sqlx::query(&statement)
            .bind(id.as_uuid())
            .execute(&mut *self.conn)
            .await
            .map_err(|e| Error::storage(format!("Failed to delete from {table}: {e}")))?;
        Ok(())
    }

    async fn fetch_artifacts(
        &mut self,
        filter: &str,
        value: String,
    ) -> Result<Vec<ArtifactRecord>> {
        let statement = format!("SELECT {ARTIFACT_COLUMNS} FROM artifacts WHERE {filter} = $1 ORDER BY name");
        let rows = sqlx::query_as::<_, ArtifactRow>(&statement)
            .bind(value)
            .fetch_all(&mut *self.conn)
            .await
            .map_err(|e| Error::storage(format!("Failed to query artifacts: {e}")))?;
        convert(rows)
    }
}

impl Drop for PostgresSession {
    fn drop(&mut self) {
        // An open scope cannot be rolled back here; never hand the
        // connection back to the pool mid-transaction.
        if !self.held.is_empty() {
            self.conn.close_on_drop();
        }
    }
}

#[async_trait]
impl StoreSession for PostgresSession {
    async fn lock_tables(&mut self, locks: &LockSet) -> Result<()> {
        if !self.held.is_empty() {
            return Err(Error::lock("a lock scope is already open on this session"));
        }
        self.execute_raw("BEGIN").await?;
        for (table, mode) in locks.iter() {
            let mode = match mode {
                LockMode::Read => "SHARE",
                LockMode::Write => "EXCLUSIVE",
            };
            let statement = format!("LOCK TABLE {} IN {mode} MODE", table.as_ref());
            if let Err(e) = self.execute_raw(&statement).await {
                self.execute_raw("ROLLBACK").await?;
                return Err(e);
            }
        }
        self.held = locks.clone();
        Ok(())
    }

    async fn unlock_tables(&mut self) -> Result<()> {
        if self.held.is_empty() {
            return Ok(());
        }
        self.held = LockSet::new();
        self.execute_raw("COMMIT").await
    }

    async fn rollback_tables(&mut self) -> Result<()> {
        if self.held.is_empty() {
            return Ok(());
        }
        self.held = LockSet::new();
        warn!("Rolling back lock scope");
        self.execute_raw("ROLLBACK").await
    }

    async fn insert_artifact(&mut self, artifact: &ArtifactRecord) -> Result<()> {
        self.held.ensure_write(Table::Artifacts)?;
        sqlx::query(
            "INSERT INTO artifacts (artifact_id, name, kind, path, hash, stage)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(artifact.id.as_uuid())
        .bind(&artifact.name)
        .bind(artifact.kind.as_ref())
        .bind(&artifact.path)
        .bind(&artifact.hash)
        .bind(artifact.stage.as_ref())
        .execute(&mut *self.conn)
        .await
        .map_err(|e| Error::storage(format!("Failed to insert artifact: {e}")))?;
        Ok(())
    }

    async fn get_artifact(&mut self, id: ArtifactId) -> Result<Option<ArtifactRecord>> {
        let statement = format!("SELECT {ARTIFACT_COLUMNS} FROM artifacts WHERE artifact_id = $1");
        let row = sqlx::query_as::<_, ArtifactRow>(&statement)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.conn)
            .await
            .map_err(|e| Error::storage(format!("Failed to get artifact: {e}")))?;
        row.map(ArtifactRecord::try_from).transpose()
    }

    async fn find_artifact_by_hash(&mut self, hash: &str) -> Result<Option<ArtifactRecord>> {
        Ok(self
            .fetch_artifacts("hash", hash.to_string())
            .await?
            .into_iter()
            .next())
    }

    async fn find_artifact_by_path(&mut self, path: &str) -> Result<Option<ArtifactRecord>> {
        Ok(self
            .fetch_artifacts("path", path.to_string())
            .await?
            .into_iter()
            .next())
    }

    async fn artifacts_by_kind(&mut self, kind: ArtifactKind) -> Result<Vec<ArtifactRecord>> {
        self.fetch_artifacts("kind", kind.to_string()).await
    }

    async fn mark_artifact_stage(&mut self, id: ArtifactId, stage: StageMarker) -> Result<()> {
        self.held.ensure_write(Table::Artifacts)?;
        let result = sqlx::query("UPDATE artifacts SET stage = $1 WHERE artifact_id = $2")
            .bind(stage.as_ref())
            .bind(id.as_uuid())
            .execute(&mut *self.conn)
            .await
            .map_err(|e| Error::storage(format!("Failed to mark artifact stage: {e}")))?;
        if result.rows_affected() == 0 {
            return Err(Error::storage(format!("artifact {id} not found")));
        }
        Ok(())
    }

    async fn delete_artifact(&mut self, id: ArtifactId) -> Result<()> {
        let tables = [
            Table::ArtifactDependencies,
            Table::Files,
            Table::Problems,
            Table::Entities,
            Table::Relations,
            Table::Imports,
            Table::Comments,
            Table::Artifacts,
        ];
        for table in tables {
            self.held.ensure_write(table)?;
        }
        for table in tables {
            self.delete_owned(table, id).await?;
        }
        debug!(artifact = %id, "Deleted artifact contents");
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
        sqlx::query("DELETE FROM entities WHERE artifact_id = $1 AND kind = ANY($2)")
            .bind(id.as_uuid())
            .bind(synthetic_kinds())
            .execute(&mut *self.conn)
            .await
            .map_err(|e| Error::storage(format!("Failed to delete synthetic entities: {e}")))?;
        for table in [Table::Relations, Table::Imports, Table::Comments] {
            self.delete_owned(table, id).await?;
        }
        Ok(())
    }

    async fn insert_artifact_dependencies(&mut self, deps: &[ArtifactDependency]) -> Result<()> {
        self.held.ensure_write(Table::ArtifactDependencies)?;
        if deps.is_empty() {
            return Ok(());
        }
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO artifact_dependencies (artifact_id, dependency_id) ");
        query_builder.push_values(deps, |mut b, dep| {
            b.push_bind(dep.artifact.as_uuid())
                .push_bind(dep.dependency.as_uuid());
        });
        query_builder.push(" ON CONFLICT DO NOTHING");
        query_builder
            .build()
            .execute(&mut *self.conn)
            .await
            .map_err(|e| Error::storage(format!("Failed to insert dependencies: {e}")))?;
        Ok(())
    }

    async fn artifact_dependencies(&mut self, id: ArtifactId) -> Result<Vec<ArtifactId>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT dependency_id FROM artifact_dependencies WHERE artifact_id = $1",
        )
        .bind(id.as_uuid())
        .fetch_all(&mut *self.conn)
        .await
        .map_err(|e| Error::storage(format!("Failed to get dependencies: {e}")))?;
        Ok(ids.into_iter().map(ArtifactId::from).collect())
    }

    async fn batch_insert_files(&mut self, files: &[FileRecord]) -> Result<()> {
        self.held.ensure_write(Table::Files)?;
        if files.is_empty() {
            return Ok(());
        }
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO files (file_id, artifact_id, kind, path) ");
        query_builder.push_values(files, |mut b, file| {
            b.push_bind(file.id.as_uuid())
                .push_bind(file.artifact.as_uuid())
                .push_bind(file.kind.as_ref())
                .push_bind(&file.path);
        });
        query_builder
            .build()
            .execute(&mut *self.conn)
            .await
            .map_err(|e| Error::storage(format!("Failed to insert files: {e}")))?;
        Ok(())
    }

    async fn files_for_artifact(&mut self, id: ArtifactId) -> Result<Vec<FileRecord>> {
        let rows = sqlx::query_as::<_, FileRow>(
            "SELECT file_id, artifact_id, kind, path FROM files WHERE artifact_id = $1",
        )
        .bind(id.as_uuid())
        .fetch_all(&mut *self.conn)
        .await
        .map_err(|e| Error::storage(format!("Failed to get files: {e}")))?;
        convert(rows)
    }

    async fn batch_insert_problems(&mut self, problems: &[ProblemRecord]) -> Result<()> {
        self.held.ensure_write(Table::Problems)?;
        if problems.is_empty() {
            return Ok(());
        }
        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO problems (artifact_id, file_id, kind, error_code, message) ",
        );
        query_builder.push_values(problems, |mut b, problem| {
            b.push_bind(problem.artifact.as_uuid())
                .push_bind(problem.file.as_uuid())
                .push_bind(problem.kind.as_ref())
                .push_bind(problem.error_code)
                .push_bind(&problem.message);
        });
        query_builder
            .build()
            .execute(&mut *self.conn)
            .await
            .map_err(|e| Error::storage(format!("Failed to insert problems: {e}")))?;
        Ok(())
    }

    async fn problems_for_artifact(&mut self, id: ArtifactId) -> Result<Vec<ProblemRecord>> {
        let rows = sqlx::query_as::<_, ProblemRow>(
            "SELECT artifact_id, file_id, kind, error_code, message FROM problems
             WHERE artifact_id = $1",
        )
        .bind(id.as_uuid())
        .fetch_all(&mut *self.conn)
        .await
        .map_err(|e| Error::storage(format!("Failed to get problems: {e}")))?;
        convert(rows)
    }

    async fn create_entity(
        &mut self,
        artifact: ArtifactId,
        kind: EntityKind,
        fqn: &str,
        location: Option<Location>,
    ) -> Result<EntityId> {
        let mut entity = EntityRecord::new(artifact, kind, fqn);
        entity.location = location;
        self.batch_insert_entities(std::slice::from_ref(&entity))
            .await?;
        Ok(entity.id)
    }

    async fn batch_insert_entities(&mut self, entities: &[EntityRecord]) -> Result<()> {
        self.held.ensure_write(Table::Entities)?;
        if entities.is_empty() {
            return Ok(());
        }
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("INSERT INTO entities ({ENTITY_COLUMNS}) "));
        query_builder.push_values(entities, |mut b, entity| {
            let (file, offset, length) = location_parts(entity.location.as_ref());
            b.push_bind(entity.id.as_uuid())
                .push_bind(entity.artifact.as_uuid())
                .push_bind(entity.kind.as_ref())
                .push_bind(&entity.fqn)
                .push_bind(entity.modifiers)
                .push_bind(entity.multiplicity)
                .push_bind(file)
                .push_bind(offset)
                .push_bind(length);
        });
        query_builder
            .build()
            .execute(&mut *self.conn)
            .await
            .map_err(|e| Error::storage(format!("Failed to insert entities: {e}")))?;
        Ok(())
    }

    async fn entities_for_artifact(&mut self, id: ArtifactId) -> Result<Vec<EntityRecord>> {
        let statement = format!("SELECT {ENTITY_COLUMNS} FROM entities WHERE artifact_id = $1");
        let rows = sqlx::query_as::<_, EntityRow>(&statement)
            .bind(id.as_uuid())
            .fetch_all(&mut *self.conn)
            .await
            .map_err(|e| Error::storage(format!("Failed to get entities: {e}")))?;
        convert(rows)
    }

    async fn find_entity_by_ref(
        &mut self,
        fqn: &str,
        artifact: ArtifactId,
    ) -> Result<Option<EntityId>> {
        let id: Option<Uuid> = sqlx::query_scalar(
            "SELECT entity_id FROM entities WHERE fqn = $1 AND artifact_id = $2 LIMIT 1",
        )
        .bind(fqn)
        .bind(artifact.as_uuid())
        .fetch_optional(&mut *self.conn)
        .await
        .map_err(|e| Error::storage(format!("Failed to find entity: {e}")))?;
        Ok(id.map(EntityId::from))
    }

    async fn find_entities_by_ref(
        &mut self,
        fqn: &str,
        artifacts: &[ArtifactId],
    ) -> Result<Vec<EntityRecord>> {
        if artifacts.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = artifacts.iter().map(ArtifactId::as_uuid).collect();
        let statement = format!(
            "SELECT {ENTITY_COLUMNS} FROM entities
             WHERE fqn = $1 AND artifact_id = ANY($2) AND kind = ANY($3)"
        );
        let rows = sqlx::query_as::<_, EntityRow>(&statement)
            .bind(fqn)
            .bind(ids)
            .bind(declared_kinds())
            .fetch_all(&mut *self.conn)
            .await
            .map_err(|e| Error::storage(format!("Failed to find entities: {e}")))?;
        convert(rows)
    }

    async fn batch_insert_relations(&mut self, relations: &[RelationRecord]) -> Result<()> {
        self.held.ensure_write(Table::Relations)?;
        if relations.is_empty() {
            return Ok(());
        }
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("INSERT INTO relations ({RELATION_COLUMNS}) "));
        query_builder.push_values(relations, |mut b, relation| {
            let (file, offset, length) = location_parts(relation.location.as_ref());
            b.push_bind(relation.kind.as_ref())
                .push_bind(relation.class.as_ref())
                .push_bind(relation.lhs.as_uuid())
                .push_bind(relation.rhs.as_uuid())
                .push_bind(relation.artifact.as_uuid())
                .push_bind(file)
                .push_bind(offset)
                .push_bind(length);
        });
        query_builder
            .build()
            .execute(&mut *self.conn)
            .await
            .map_err(|e| Error::storage(format!("Failed to insert relations: {e}")))?;
        Ok(())
    }

    async fn relations_for_artifact(&mut self, id: ArtifactId) -> Result<Vec<RelationRecord>> {
        let statement = format!("SELECT {RELATION_COLUMNS} FROM relations WHERE artifact_id = $1");
        let rows = sqlx::query_as::<_, RelationRow>(&statement)
            .bind(id.as_uuid())
            .fetch_all(&mut *self.conn)
            .await
            .map_err(|e| Error::storage(format!("Failed to get relations: {e}")))?;
        convert(rows)
    }

    async fn batch_insert_imports(&mut self, imports: &[ImportRecord]) -> Result<()> {
        self.held.ensure_write(Table::Imports)?;
        if imports.is_empty() {
            return Ok(());
        }
        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO imports (artifact_id, entity_id, is_static, on_demand, file_id, start_offset, length) ",
        );
        query_builder.push_values(imports, |mut b, import| {
            b.push_bind(import.artifact.as_uuid())
                .push_bind(import.entity.as_uuid())
                .push_bind(import.is_static)
                .push_bind(import.on_demand)
                .push_bind(import.location.file.as_uuid())
                .push_bind(import.location.offset)
                .push_bind(import.location.length);
        });
        query_builder
            .build()
            .execute(&mut *self.conn)
            .await
            .map_err(|e| Error::storage(format!("Failed to insert imports: {e}")))?;
        Ok(())
    }

    async fn imports_for_artifact(&mut self, id: ArtifactId) -> Result<Vec<ImportRecord>> {
        let rows = sqlx::query_as::<_, ImportRow>(
            "SELECT artifact_id, entity_id, is_static, on_demand, file_id, start_offset, length
             FROM imports WHERE artifact_id = $1",
        )
        .bind(id.as_uuid())
        .fetch_all(&mut *self.conn)
        .await
        .map_err(|e| Error::storage(format!("Failed to get imports: {e}")))?;
        Ok(rows.into_iter().map(ImportRecord::from).collect())
    }

    async fn batch_insert_comments(&mut self, comments: &[CommentRecord]) -> Result<()> {
        self.held.ensure_write(Table::Comments)?;
        if comments.is_empty() {
            return Ok(());
        }
        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO comments (artifact_id, kind, entity_id, file_id, start_offset, length) ",
        );
        query_builder.push_values(comments, |mut b, comment| {
            b.push_bind(comment.artifact.as_uuid())
                .push_bind(comment.kind.as_ref())
                .push_bind(comment.entity.map(|e| e.as_uuid()))
                .push_bind(comment.location.file.as_uuid())
                .push_bind(comment.location.offset)
                .push_bind(comment.location.length);
        });
        query_builder
            .build()
            .execute(&mut *self.conn)
            .await
            .map_err(|e| Error::storage(format!("Failed to insert comments: {e}")))?;
        Ok(())
    }

    async fn comments_for_artifact(&mut self, id: ArtifactId) -> Result<Vec<CommentRecord>> {
        let rows = sqlx::query_as::<_, CommentRow>(
            "SELECT artifact_id, kind, entity_id, file_id, start_offset, length
             FROM comments WHERE artifact_id = $1",
        )
        .bind(id.as_uuid())
        .fetch_all(&mut *self.conn)
        .await
        .map_err(|e| Error::storage(format!("Failed to get comments: {e}")))?;
        convert(rows)
    }
}
