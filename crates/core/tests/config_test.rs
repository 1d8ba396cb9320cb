use javagraph_core::config::{Config, ImporterConfig, StorageConfig, MAX_THREAD_COUNT};
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.importer.thread_count, 4);
    assert_eq!(config.importer.max_rows_per_batch, 1000);
    assert!(!config.importer.strict_references);
    assert_eq!(config.storage.provider, "memory");
    assert_eq!(config.repository.input_path, PathBuf::from("repo"));
    assert!(config.validate().is_ok());
}

#[test]
fn test_storage_config_defaults() {
    let config = StorageConfig::default();
    assert_eq!(config.postgres_host, "localhost");
    assert_eq!(config.postgres_port, 5432);
    assert_eq!(config.postgres_database, "javagraph");
    assert_eq!(config.postgres_pool_size, 20);
}

#[test]
fn test_config_validation_storage_provider() {
    let mut config = Config::default();

    config.storage.provider = "postgres".to_string();
    assert!(config.validate().is_ok());

    config.storage.provider = "qdrant".to_string();
    let result = config.validate();
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("Invalid storage provider"));
}

#[test]
fn test_config_validation_thread_count() {
    let mut config = Config {
        importer: ImporterConfig {
            thread_count: MAX_THREAD_COUNT,
            ..Default::default()
        },
        ..Default::default()
    };
    assert!(config.validate().is_ok());

    config.importer.thread_count = MAX_THREAD_COUNT + 1;
    assert!(config.validate().is_err());
}

#[test]
fn test_partial_file_keeps_other_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[importer]
strict_references = true

[repository]
input_path = "/data/extracted"
"#,
    )
    .unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert!(config.importer.strict_references);
    assert_eq!(
        config.repository.input_path,
        PathBuf::from("/data/extracted")
    );
    assert_eq!(config.storage.provider, "memory");
}

#[test]
fn test_environment_overrides_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(&path, "[importer]\nmax_rows_per_batch = 10\n").unwrap();

    std::env::set_var("JAVAGRAPH_IMPORTER__MAX_ROWS_PER_BATCH", "25");
    let config = Config::load(Some(&path));
    std::env::remove_var("JAVAGRAPH_IMPORTER__MAX_ROWS_PER_BATCH");

    assert_eq!(config.unwrap().importer.max_rows_per_batch, 25);
}
