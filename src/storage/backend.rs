//! StorageBackend trait definition.
//!
//! Storage is an opaque key to bytes map; the core decides what goes in it.

use crate::core::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Backend type identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    /// In-process map
    Memory,
    /// One file per key under a base directory
    Local,
}

impl std::fmt::Display for StorageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageKind::Memory => write!(f, "memory"),
            StorageKind::Local => write!(f, "local"),
        }
    }
}

/// Core trait for storage backends.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store `data` under `key`, replacing any previous value.
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()>;

    /// Read the value under `key`, `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Keys starting with `prefix`, sorted.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Remove `key`. Returns whether it existed.
    async fn delete(&self, key: &str) -> Result<bool>;

    fn kind(&self) -> StorageKind;

    /// Health check for the backend.
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

/// Keys are `/`-separated relative paths of plain segments.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::Storage("empty storage key".into()));
    }
    if key.starts_with('/') || key.contains('\\') {
        return Err(Error::Storage(format!("invalid storage key {key:?}")));
    }
    if key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(Error::Storage(format!("invalid storage key {key:?}")));
    }
    Ok(())
}
