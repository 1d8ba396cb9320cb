//! Configuration module for the javagraph importer
//!
//! Configuration can be loaded from TOML files and/or environment variables.

mod defaults;
mod loading;

#[cfg(test)]
mod tests;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use defaults::{MAX_ROWS_PER_BATCH, MAX_THREAD_COUNT};

use defaults::*;

/// Storage providers accepted by `storage.provider`
pub const STORAGE_PROVIDERS: [&str; 2] = ["memory", "postgres"];

/// Returns the path to the global configuration file
///
/// The global config is stored at `~/.javagraph/config.toml`.
pub fn global_config_path() -> Result<PathBuf> {
    let home_dir = dirs::home_dir()
        .ok_or_else(|| Error::config("Unable to determine home directory".to_string()))?;
    Ok(home_dir.join(".javagraph").join("config.toml"))
}

/// Importer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImporterConfig {
    /// Number of concurrent import workers
    #[serde(default = "default_thread_count")]
    pub thread_count: usize,

    /// Maximum rows sent in a single batch insert
    #[serde(default = "default_max_rows_per_batch")]
    pub max_rows_per_batch: usize,

    /// Fail an artifact on its first missing file or dangling relation
    /// endpoint instead of logging and dropping the fact
    #[serde(default = "default_strict_references")]
    pub strict_references: bool,
}

impl Default for ImporterConfig {
    fn default() -> Self {
        Self {
            thread_count: default_thread_count(),
            max_rows_per_batch: default_max_rows_per_batch(),
            strict_references: default_strict_references(),
        }
    }
}

/// Storage configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend: "memory" (default) or "postgres"
    #[serde(default = "default_storage_provider")]
    pub provider: String,

    /// Postgres host address
    #[serde(default = "default_postgres_host")]
    pub postgres_host: String,

    /// Postgres port
    #[serde(default = "default_postgres_port")]
    pub postgres_port: u16,

    /// Postgres database name
    #[serde(default = "default_postgres_database")]
    pub postgres_database: String,

    /// Postgres username
    #[serde(default = "default_postgres_user")]
    pub postgres_user: String,

    /// Postgres password
    #[serde(default = "default_postgres_password")]
    pub postgres_password: String,

    /// Postgres connection pool size (max connections)
    #[serde(default = "default_postgres_pool_size")]
    pub postgres_pool_size: u32,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("provider", &self.provider)
            .field("postgres_host", &self.postgres_host)
            .field("postgres_port", &self.postgres_port)
            .field("postgres_database", &self.postgres_database)
            .field("postgres_user", &self.postgres_user)
            .field("postgres_password", &"***")
            .field("postgres_pool_size", &self.postgres_pool_size)
            .finish()
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: default_storage_provider(),
            postgres_host: default_postgres_host(),
            postgres_port: default_postgres_port(),
            postgres_database: default_postgres_database(),
            postgres_user: default_postgres_user(),
            postgres_password: default_postgres_password(),
            postgres_pool_size: default_postgres_pool_size(),
        }
    }
}

impl StorageConfig {
    /// Connection URL for the Postgres backend
    pub fn postgres_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.postgres_user,
            self.postgres_password,
            self.postgres_host,
            self.postgres_port,
            self.postgres_database
        )
    }
}

/// Extracted repository configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Root of the extracted repository (holds libraries/, jars/, projects/)
    #[serde(default = "default_input_path")]
    pub input_path: PathBuf,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            input_path: default_input_path(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Importer configuration
    #[serde(default)]
    pub importer: ImporterConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Extracted repository configuration
    #[serde(default)]
    pub repository: RepositoryConfig,
}

impl Config {
    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.importer.thread_count == 0 {
            return Err(Error::config(
                "importer.thread_count must be greater than 0".to_string(),
            ));
        }
        if self.importer.thread_count > MAX_THREAD_COUNT {
            return Err(Error::config(format!(
                "importer.thread_count too large (max {MAX_THREAD_COUNT}, got {})",
                self.importer.thread_count
            )));
        }

        if self.importer.max_rows_per_batch == 0 {
            return Err(Error::config(
                "importer.max_rows_per_batch must be greater than 0".to_string(),
            ));
        }

        if self.importer.max_rows_per_batch > MAX_ROWS_PER_BATCH {
            return Err(Error::config(format!(
                "importer.max_rows_per_batch too large (max {MAX_ROWS_PER_BATCH}, got {})",
                self.importer.max_rows_per_batch
            )));
        }

        if !STORAGE_PROVIDERS.contains(&self.storage.provider.as_str()) {
            return Err(Error::config(format!(
                "Invalid storage provider '{}'. Must be one of: {:?}",
                self.storage.provider, STORAGE_PROVIDERS
            )));
        }

        if self.storage.provider == "postgres" && self.storage.postgres_pool_size == 0 {
            return Err(Error::config(
                "storage.postgres_pool_size must be greater than 0".to_string(),
            ));
        }

        // Every worker holds one pooled connection for a whole stage
        if self.storage.provider == "postgres"
            && self.importer.thread_count > self.storage.postgres_pool_size as usize
        {
            return Err(Error::config(format!(
                "importer.thread_count ({}) exceeds storage.postgres_pool_size ({})",
                self.importer.thread_count, self.storage.postgres_pool_size
            )));
        }

        Ok(())
    }

    /// Serializes the configuration to a TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("Failed to serialize config: {e}")))
    }
}
