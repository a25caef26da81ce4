//! Signed decision records over a storage backend.
//!
//! Layout:
//! - `records/<record_id>`: canonical bytes of the record
//! - `records/<record_id>.sig`: JSON list of signatures
//! - `objects/<hash>`: content-addressed canonical values

use crate::canon::{canonicalize, hash, CanonicalValue};
use crate::core::{ContentHash, Error, Result};
use crate::decision::{DecisionRecord, RecordId};
use crate::signing::{RecordSigner, Signature};
use crate::storage::backend::StorageBackend;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

const RECORDS_PREFIX: &str = "records/";
const OBJECTS_PREFIX: &str = "objects/";
const SIGNATURE_SUFFIX: &str = ".sig";

/// A record loaded back from storage with its signatures.
#[derive(Clone, Debug)]
pub struct StoredRecord {
    pub record: DecisionRecord,
    /// Exact stored bytes
    pub bytes: Vec<u8>,
    pub signatures: Vec<Signature>,
}

/// Store for signed decision records and canonical objects.
///
/// Signature lists are read-modify-written under a per-record lock shared
/// by clones of the store.
#[derive(Clone)]
pub struct RecordStore {
    backend: Arc<dyn StorageBackend>,
    record_locks: Arc<Mutex<HashMap<RecordId, Arc<tokio::sync::Mutex<()>>>>>,
}

fn record_key(id: &RecordId) -> String {
    format!("{RECORDS_PREFIX}{}", id.to_hex())
}

fn signature_key(id: &RecordId) -> String {
    format!("{RECORDS_PREFIX}{}{SIGNATURE_SUFFIX}", id.to_hex())
}

fn object_key(hash: &ContentHash) -> String {
    format!("{OBJECTS_PREFIX}{}", hash.to_hex())
}

impl RecordStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            record_locks: Arc::default(),
        }
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// Store a record and its signatures side by side.
    ///
    /// Signatures already stored for the record are kept; the given ones
    /// are merged in.
    pub async fn store(&self, record: &DecisionRecord, signatures: &[Signature]) -> Result<()> {
        record.verify_integrity()?;
        for sig in signatures {
            check_binding(record.record_id(), sig)?;
        }
        let bytes = record.canonical_bytes()?;
        let id = record.record_id();

        let lock = self.record_lock(id)?;
        let _guard = lock.lock().await;
        self.backend.put(&record_key(id), bytes.into_vec()).await?;
        let total = self.merge_signatures(id, signatures).await?;

        info!(record_id = %id.short(), signatures = total, "decision record stored");
        Ok(())
    }

    /// Attach one more signature to a stored record.
    pub async fn add_signature(&self, signature: Signature) -> Result<()> {
        let id = signature.record_id.clone();
        let lock = self.record_lock(&id)?;
        let _guard = lock.lock().await;
        if self.backend.get(&record_key(&id)).await?.is_none() {
            return Err(Error::Storage(format!("no stored record {id}")));
        }
        self.merge_signatures(&id, std::slice::from_ref(&signature))
            .await
            .map(|_| ())
    }

    /// Signatures stored for a record; empty when none were stored.
    pub async fn signatures(&self, id: &RecordId) -> Result<Vec<Signature>> {
        match self.backend.get(&signature_key(id)).await? {
            Some(raw) => serde_json::from_slice(&raw)
                .map_err(|e| Error::DeserializationError(format!("signatures for {id}: {e}"))),
            None => Ok(Vec::new()),
        }
    }

    /// Load a record, checking that its content still hashes to `id`.
    pub async fn load(&self, id: &RecordId) -> Result<Option<StoredRecord>> {
        let Some(bytes) = self.backend.get(&record_key(id)).await? else {
            return Ok(None);
        };
        let record = DecisionRecord::from_canonical_bytes(&bytes)?;
        if record.record_id() != id {
            return Err(Error::IntegrityMismatch {
                expected: id.to_hex(),
                actual: record.record_id().to_hex(),
            });
        }
        let signatures = self.signatures(id).await?;
        Ok(Some(StoredRecord {
            record,
            bytes,
            signatures,
        }))
    }

    /// Load a record that carries at least one valid signature.
    pub async fn load_verified(&self, id: &RecordId, signer: &RecordSigner) -> Result<StoredRecord> {
        let stored = self
            .load(id)
            .await?
            .ok_or_else(|| Error::Storage(format!("no stored record {id}")))?;
        if !stored
            .signatures
            .iter()
            .any(|sig| signer.verify_stored(&stored.bytes, sig))
        {
            return Err(Error::SignatureVerificationFailed);
        }
        Ok(stored)
    }

    /// Ids of every stored record.
    pub async fn list_records(&self) -> Result<Vec<RecordId>> {
        self.backend
            .list_keys(RECORDS_PREFIX)
            .await?
            .iter()
            .filter(|key| !key.ends_with(SIGNATURE_SUFFIX))
            .filter_map(|key| key.strip_prefix(RECORDS_PREFIX))
            .map(RecordId::from_hex)
            .collect()
    }

    /// Store a canonical value under its content hash.
    pub async fn put_value(&self, value: &CanonicalValue) -> Result<ContentHash> {
        let bytes = canonicalize(value)?;
        let content_hash = hash(&bytes);
        self.backend.put(&object_key(&content_hash), bytes.into_vec()).await?;
        Ok(content_hash)
    }

    /// Fetch a content-addressed value, re-checking its hash.
    pub async fn get_value(&self, content_hash: &ContentHash) -> Result<Option<CanonicalValue>> {
        let Some(raw) = self.backend.get(&object_key(content_hash)).await? else {
            return Ok(None);
        };
        let value = CanonicalValue::from_json_slice(&raw)?;
        let actual = hash(&canonicalize(&value)?);
        if &actual != content_hash {
            return Err(Error::IntegrityMismatch {
                expected: content_hash.to_hex(),
                actual: actual.to_hex(),
            });
        }
        Ok(Some(value))
    }

    fn record_lock(&self, id: &RecordId) -> Result<Arc<tokio::sync::Mutex<()>>> {
        let mut locks = self
            .record_locks
            .lock()
            .map_err(|_| Error::Internal("record store lock poisoned".into()))?;
        Ok(locks.entry(id.clone()).or_default().clone())
    }

    /// Append unseen signatures to the stored list. Caller holds the record lock.
    async fn merge_signatures(&self, id: &RecordId, incoming: &[Signature]) -> Result<usize> {
        let mut signatures = self.signatures(id).await?;
        let before = signatures.len();
        for sig in incoming {
            if signatures.contains(sig) {
                debug!(record_id = %id.short(), signer = %sig.signer_identity, "signature already attached");
            } else {
                signatures.push(sig.clone());
            }
        }
        if signatures.len() != before || before == 0 {
            let raw = serde_json::to_vec(&signatures)?;
            self.backend.put(&signature_key(id), raw).await?;
        }
        Ok(signatures.len())
    }
}

fn check_binding(id: &RecordId, signature: &Signature) -> Result<()> {
    if &signature.record_id != id {
        return Err(Error::Storage(format!(
            "signature by {} refers to record {}, not {}",
            signature.signer_identity, signature.record_id, id
        )));
    }
    Ok(())
}
