use crate::{GraphStore, MemoryStore, PostgresStore};
use javagraph_core::{config::StorageConfig, Error};
use std::sync::Arc;
use tracing::info;

/// Creates a graph store based on configuration.
///
/// Returns a trait object so the importer never depends on a concrete
/// backend.
///
/// # Errors
/// Returns an error for unknown providers or when the backend cannot be
/// reached
pub async fn create_store(config: &StorageConfig) -> Result<Arc<dyn GraphStore>, Error> {
    match config.provider.as_str() {
        "memory" => {
            info!("Using in-memory graph store");
            Ok(Arc::new(MemoryStore::new()) as Arc<dyn GraphStore>)
        }
        "postgres" => {
            let store = PostgresStore::connect(config).await?;
            Ok(Arc::new(store) as Arc<dyn GraphStore>)
        }
        other => Err(Error::config(format!("Unknown storage provider '{other}'"))),
    }
}

/// Creates a graph store and makes sure its schema exists.
pub async fn create_and_initialize_store(
    config: &StorageConfig,
) -> Result<Arc<dyn GraphStore>, Error> {
    let store = create_store(config).await?;
    store.initialize().await?;
    Ok(store)
}
