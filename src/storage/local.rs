//! Local filesystem storage backend.
//!
//! One file per key; `/` in a key becomes a subdirectory.

use crate::core::{Error, Result};
use crate::storage::backend::{validate_key, StorageBackend, StorageKind};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

const TMP_MARKER: &str = ".tmp-";

fn storage_error(action: &str, key: &str, err: std::io::Error) -> Error {
    Error::Storage(format!("failed to {action} {key:?}: {err}"))
}

/// Files under a base directory.
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Open storage rooted at `base_path`, creating the directory if needed.
    pub async fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        tokio::fs::create_dir_all(&base_path)
            .await
            .map_err(|e| Error::Storage(format!("failed to create {}: {e}", base_path.display())))?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(key.split('/').fold(self.base_path.clone(), |path, segment| path.join(segment)))
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| storage_error("write", key, e))?;
        }
        // Write then rename so readers never see a partial file.
        let mut tmp = path.clone().into_os_string();
        tmp.push(format!("{TMP_MARKER}{}", uuid::Uuid::new_v4()));
        let tmp = PathBuf::from(tmp);
        let written = match tokio::fs::write(&tmp, &data).await {
            Ok(()) => tokio::fs::rename(&tmp, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(storage_error("write", key, e));
        }
        debug!(key, bytes = data.len(), "stored");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_error("read", key, e)),
        }
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut stack = vec![(self.base_path.clone(), String::new())];
        while let Some((dir, dir_key)) = stack.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(storage_error("list", prefix, e)),
            };
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| storage_error("list", prefix, e))?
            {
                let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                    continue;
                };
                let key = if dir_key.is_empty() {
                    name
                } else {
                    format!("{dir_key}/{name}")
                };
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| storage_error("list", prefix, e))?;
                if file_type.is_dir() {
                    stack.push((entry.path(), key));
                } else if key.starts_with(prefix) && !key.contains(TMP_MARKER) {
                    keys.push(key);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(storage_error("delete", key, e)),
        }
    }

    fn kind(&self) -> StorageKind {
        StorageKind::Local
    }

    async fn health_check(&self) -> Result<bool> {
        match tokio::fs::metadata(&self.base_path).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(storage_error("stat", "", e)),
        }
    }
}
