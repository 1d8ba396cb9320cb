//! PostgreSQL graph store.
//!
//! A lock scope is a transaction on the session's dedicated connection that
//! starts with `LOCK TABLE` statements, so a flush is atomic as well as
//! serialized against other workers.

mod rows;
mod session;

use async_trait::async_trait;
use javagraph_core::config::StorageConfig;
use javagraph_core::{Error, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, info};

use crate::error::StorageError;
use crate::{GraphStore, StoreSession};

pub use session::PostgresSession;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS artifacts (
        artifact_id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        kind TEXT NOT NULL,
        path TEXT,
        hash TEXT,
        stage TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS artifacts_hash_idx ON artifacts (hash)",
    "CREATE INDEX IF NOT EXISTS artifacts_path_idx ON artifacts (path)",
    "CREATE TABLE IF NOT EXISTS artifact_dependencies (
        artifact_id UUID NOT NULL,
        dependency_id UUID NOT NULL,
        PRIMARY KEY (artifact_id, dependency_id)
    )",
    "CREATE TABLE IF NOT EXISTS files (
        file_id UUID PRIMARY KEY,
        artifact_id UUID NOT NULL,
        kind TEXT NOT NULL,
        path TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS files_artifact_idx ON files (artifact_id)",
    "CREATE TABLE IF NOT EXISTS problems (
        artifact_id UUID NOT NULL,
        file_id UUID NOT NULL,
        kind TEXT NOT NULL,
        error_code INTEGER NOT NULL,
        message TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS problems_artifact_idx ON problems (artifact_id)",
    "CREATE TABLE IF NOT EXISTS entities (
        entity_id UUID PRIMARY KEY,
        artifact_id UUID NOT NULL,
        kind TEXT NOT NULL,
        fqn TEXT NOT NULL,
        modifiers INTEGER,
        multiplicity INTEGER,
        file_id UUID,
        start_offset INTEGER,
        length INTEGER
    )",
    "CREATE INDEX IF NOT EXISTS entities_fqn_idx ON entities (fqn)",
    "CREATE INDEX IF NOT EXISTS entities_artifact_idx ON entities (artifact_id)",
    "CREATE TABLE IF NOT EXISTS relations (
        kind TEXT NOT NULL,
        class TEXT NOT NULL,
        lhs_id UUID NOT NULL,
        rhs_id UUID NOT NULL,
        artifact_id UUID NOT NULL,
        file_id UUID,
        start_offset INTEGER,
        length INTEGER
    )",
    "CREATE INDEX IF NOT EXISTS relations_artifact_idx ON relations (artifact_id)",
    "CREATE TABLE IF NOT EXISTS imports (
        artifact_id UUID NOT NULL,
        entity_id UUID NOT NULL,
        is_static BOOLEAN NOT NULL,
        on_demand BOOLEAN NOT NULL,
        file_id UUID NOT NULL,
        start_offset INTEGER NOT NULL,
        length INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS imports_artifact_idx ON imports (artifact_id)",
    "CREATE TABLE IF NOT EXISTS comments (
        artifact_id UUID NOT NULL,
        kind TEXT NOT NULL,
        entity_id UUID,
        file_id UUID NOT NULL,
        start_offset INTEGER NOT NULL,
        length INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS comments_artifact_idx ON comments (artifact_id)",
];

/// Graph store backed by PostgreSQL
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using the storage configuration
    pub async fn connect(config: &StorageConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.postgres_pool_size)
            .connect(&config.postgres_url())
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;
        info!(
            host = %config.postgres_host,
            database = %config.postgres_database,
            "Connected to Postgres"
        );
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl GraphStore for PostgresStore {
    async fn initialize(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| Error::storage(format!("Failed to create schema: {e}")))?;
        }
        debug!("Postgres schema ready");
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        sqlx::query(
            "TRUNCATE artifacts, artifact_dependencies, files, problems, entities, relations, imports, comments",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::storage(format!("Failed to reset database: {e}")))?;
        info!("Postgres store reset");
        Ok(())
    }

    async fn open_session(&self) -> Result<Box<dyn StoreSession>> {
        let conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;
        Ok(Box::new(PostgresSession::new(conn)))
    }
}
