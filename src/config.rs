//! Top-level configuration.
//!
//! Plain structs; where the values come from is up to the caller.

use crate::consensus::{Comparator, QuorumPolicy};
use crate::core::{Error, Result};
use crate::signing::{KeySource, RecordSigner, SignerConfig};
use crate::storage::{create_storage, RecordStore, StorageConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Settings for the whole pipeline.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatanetConfig {
    /// Agreement rule for the comparator
    pub quorum: QuorumPolicy,
    /// Scheme for new signatures
    pub signing: SignerConfig,
    /// Where records are kept
    pub storage: StorageConfig,
}

impl DatanetConfig {
    /// Parse from a JSON document; missing sections take their defaults.
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::DeserializationError(e.to_string()))
    }

    pub fn comparator(&self) -> Comparator {
        Comparator::new(self.quorum)
    }

    pub fn signer(&self, keys: Arc<dyn KeySource>) -> RecordSigner {
        self.signing.build(keys)
    }

    pub async fn record_store(&self) -> Result<RecordStore> {
        Ok(RecordStore::new(create_storage(&self.storage).await?))
    }
}
