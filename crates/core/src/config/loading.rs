//! Configuration loading from files and environment variables

use crate::error::{Error, Result};
use config::{Config as ConfigLib, ConfigBuilder as LibConfigBuilder, Environment, File};
use std::path::Path;

use super::defaults::*;
use super::{global_config_path, Config};

type DefaultBuilder = LibConfigBuilder<config::builder::DefaultState>;

/// Helper to set a config default with consistent error mapping
fn set_config_default<T: Into<config::Value>>(
    builder: DefaultBuilder,
    key: &str,
    value: T,
) -> Result<DefaultBuilder> {
    builder
        .set_default(key, value)
        .map_err(|e| Error::config(format!("Failed to set {key} default: {e}")))
}

/// Override `key` from the environment variable `var` when it is set
fn override_from_env(builder: DefaultBuilder, var: &str, key: &str) -> Result<DefaultBuilder> {
    match std::env::var(var) {
        Ok(value) => builder
            .set_override(key, value)
            .map_err(|e| Error::config(format!("Failed to set {var}: {e}"))),
        Err(_) => Ok(builder),
    }
}

impl Config {
    /// Loads configuration from a TOML file with environment variable overrides
    ///
    /// Environment variables are prefixed with `JAVAGRAPH_` and use double underscores
    /// for nested values. For example:
    /// - `JAVAGRAPH_IMPORTER__THREAD_COUNT=16`
    /// - `JAVAGRAPH_STORAGE__PROVIDER=postgres`
    pub fn from_file(path: &Path) -> Result<Self> {
        let builder = ConfigLib::builder();

        let builder =
            set_config_default(builder, "importer.thread_count", default_thread_count() as i64)?;
        let builder = set_config_default(
            builder,
            "importer.max_rows_per_batch",
            default_max_rows_per_batch() as i64,
        )?;
        let builder = set_config_default(
            builder,
            "importer.strict_references",
            default_strict_references(),
        )?;
        let builder = set_config_default(builder, "storage.provider", default_storage_provider())?;
        let builder = set_config_default(
            builder,
            "repository.input_path",
            default_input_path().to_string_lossy().to_string(),
        )?;

        let mut builder = builder;

        // Add the config file if it exists
        if path.exists() {
            builder = builder.add_source(File::from(path));
        }

        // Add environment variables with JAVAGRAPH_ prefix
        builder = builder.add_source(
            Environment::with_prefix("JAVAGRAPH")
                .separator("__")
                .try_parsing(true),
        );

        // Support conventional Postgres environment variables
        builder = override_from_env(builder, "POSTGRES_HOST", "storage.postgres_host")?;
        if let Ok(port) = std::env::var("POSTGRES_PORT") {
            if let Ok(port_num) = port.parse::<u16>() {
                builder = builder
                    .set_override("storage.postgres_port", port_num)
                    .map_err(|e| Error::config(format!("Failed to set POSTGRES_PORT: {e}")))?;
            }
        }
        builder = override_from_env(builder, "POSTGRES_DATABASE", "storage.postgres_database")?;
        builder = override_from_env(builder, "POSTGRES_USER", "storage.postgres_user")?;
        builder = override_from_env(builder, "POSTGRES_PASSWORD", "storage.postgres_password")?;

        let config = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| Error::config(format!("Failed to deserialize config: {e}")))
    }

    /// Creates a config from a TOML string (useful for testing)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from a single file
    ///
    /// Precedence (lowest to highest):
    /// 1. Hardcoded defaults
    /// 2. Config file (~/.javagraph/config.toml or custom --config path)
    /// 3. Environment variables (JAVAGRAPH_*, POSTGRES_*)
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let path = match config_path {
            Some(p) => p.to_path_buf(),
            None => global_config_path()?,
        };
        Self::from_file(&path)
    }
}
