//! Storage backend configuration.

use crate::storage::backend::StorageKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Storage layer configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend type to use
    pub backend: StorageKind,
    /// Local-filesystem config
    #[serde(default)]
    pub local: Option<LocalConfig>,
}

impl StorageConfig {
    /// In-memory storage.
    pub fn memory() -> Self {
        Self {
            backend: StorageKind::Memory,
            local: None,
        }
    }

    /// Files under `base_path`.
    pub fn local(base_path: impl Into<PathBuf>) -> Self {
        Self {
            backend: StorageKind::Local,
            local: Some(LocalConfig {
                base_path: base_path.into(),
            }),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::memory()
    }
}

/// Local filesystem configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Base directory for stored keys
    pub base_path: PathBuf,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("./data"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_memory() {
        assert_eq!(StorageConfig::default().backend, StorageKind::Memory);
    }

    #[test]
    fn test_local_from_json() {
        let config: StorageConfig =
            serde_json::from_str(r#"{"backend":"local","local":{"base_path":"/var/datanet"}}"#)
                .unwrap();
        assert_eq!(config, StorageConfig::local("/var/datanet"));
    }
}
