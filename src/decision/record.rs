//! Decision record structure.
//!
//! Content-addressed, immutable statements proposing or accepting a
//! change to the canonical data set.

use crate::canon::{canonicalize, from_canonical, hash, sha256, to_canonical, CanonicalBytes, CanonicalValue};
use crate::consensus::ConsensusVerdict;
use crate::core::{ContentHash, Error, Result, Timestamp};
use serde::{Deserialize, Serialize};

/// Identity of a decision record: the content hash of its body.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(ContentHash);

impl RecordId {
    pub fn new(hash: ContentHash) -> Self {
        Self(hash)
    }

    pub fn as_hash(&self) -> &ContentHash {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        ContentHash::from_hex(s)
            .map(Self)
            .map_err(|e| Error::DeserializationError(format!("invalid record id {s:?}: {e}")))
    }

    /// Short prefix for log lines.
    pub fn short(&self) -> String {
        self.0.short()
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a decision record states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    /// A proposed change to the canon, awaiting review
    CanonProposal,
    /// Acceptance of a job result backed by consensus
    AcceptanceDecision,
}

impl std::fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionKind::CanonProposal => write!(f, "canon_proposal"),
            DecisionKind::AcceptanceDecision => write!(f, "acceptance_decision"),
        }
    }
}

/// Every field of a record except its identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct DecisionContent {
    pub kind: DecisionKind,
    pub current_canon_ref: ContentHash,
    pub proposed_change: CanonicalValue,
    pub rationale: String,
    pub author: String,
    pub created_at: Timestamp,
    pub consensus_ref: Option<ConsensusVerdict>,
}

/// Field name carrying the record identity in the canonical form.
const RECORD_ID_FIELD: &str = "record_id";

/// An immutable decision record.
///
/// Fields are read-only; any edit has to go through composition again and
/// yields a new `record_id`.
#[derive(Clone, Debug, PartialEq)]
pub struct DecisionRecord {
    record_id: RecordId,
    content: DecisionContent,
}

impl DecisionRecord {
    /// Seal content into a record by hashing its canonical body.
    pub(crate) fn seal(content: DecisionContent) -> Result<Self> {
        let record_id = RecordId::new(body_hash(&content)?);
        Ok(Self { record_id, content })
    }

    pub fn record_id(&self) -> &RecordId {
        &self.record_id
    }

    pub fn kind(&self) -> DecisionKind {
        self.content.kind
    }

    pub fn current_canon_ref(&self) -> &ContentHash {
        &self.content.current_canon_ref
    }

    pub fn proposed_change(&self) -> &CanonicalValue {
        &self.content.proposed_change
    }

    pub fn rationale(&self) -> &str {
        &self.content.rationale
    }

    pub fn author(&self) -> &str {
        &self.content.author
    }

    pub fn created_at(&self) -> Timestamp {
        self.content.created_at
    }

    pub fn consensus_ref(&self) -> Option<&ConsensusVerdict> {
        self.content.consensus_ref.as_ref()
    }

    /// The full canonical value, `record_id` included.
    pub fn canonical_value(&self) -> Result<CanonicalValue> {
        Ok(to_canonical(&self.content)?.with_entry(RECORD_ID_FIELD, self.record_id.to_hex()))
    }

    /// The exact bytes that get stored and signed.
    pub fn canonical_bytes(&self) -> Result<CanonicalBytes> {
        canonicalize(&self.canonical_value()?)
    }

    /// Recompute the identity from the body and compare.
    pub fn verify_integrity(&self) -> Result<()> {
        let actual = body_hash(&self.content)?;
        if &actual != self.record_id.as_hash() {
            return Err(Error::IntegrityMismatch {
                expected: self.record_id.to_hex(),
                actual: actual.to_hex(),
            });
        }
        Ok(())
    }

    /// Reload a record from stored canonical bytes.
    ///
    /// The bytes must be in canonical form and the embedded `record_id`
    /// must match the body.
    pub fn from_canonical_bytes(bytes: &[u8]) -> Result<Self> {
        let value = CanonicalValue::from_json_slice(bytes)?;
        let recanonical = canonicalize(&value)?;
        if recanonical.as_bytes() != bytes {
            return Err(Error::IntegrityMismatch {
                expected: sha256(bytes).to_hex(),
                actual: hash(&recanonical).to_hex(),
            });
        }

        let kind = value.kind();
        let CanonicalValue::Mapping(mut map) = value else {
            return Err(Error::DeserializationError(format!(
                "decision record must be a mapping, got {kind}"
            )));
        };
        let record_id = match map.remove(RECORD_ID_FIELD) {
            Some(CanonicalValue::String(s)) => RecordId::from_hex(&s)?,
            _ => {
                return Err(Error::DeserializationError(
                    "decision record is missing record_id".into(),
                ))
            }
        };
        let content: DecisionContent = from_canonical(&CanonicalValue::Mapping(map))?;

        let record = Self { record_id, content };
        record.verify_integrity()?;
        Ok(record)
    }
}

fn body_hash(content: &DecisionContent) -> Result<ContentHash> {
    Ok(hash(&canonicalize(&to_canonical(content)?)?))
}
