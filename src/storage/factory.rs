//! Backend factory.
//!
//! Creates storage backends based on configuration.

use crate::core::Result;
use crate::storage::backend::{StorageBackend, StorageKind};
use crate::storage::config::StorageConfig;
use crate::storage::local::LocalStorage;
use crate::storage::memory::MemoryStorage;
use std::sync::Arc;
use tracing::info;

/// Create a storage backend from configuration.
pub async fn create_storage(config: &StorageConfig) -> Result<Arc<dyn StorageBackend>> {
    let backend: Arc<dyn StorageBackend> = match config.backend {
        StorageKind::Memory => Arc::new(MemoryStorage::new()),
        StorageKind::Local => {
            let local = config.local.clone().unwrap_or_default();
            Arc::new(LocalStorage::new(local.base_path).await?)
        }
    };
    info!(backend = %backend.kind(), "storage backend ready");
    Ok(backend)
}
