//! Signature scheme capability and the signature envelope.

use crate::core::Result;
use crate::decision::RecordId;
use crate::signing::detached::DetachedScheme;
use crate::signing::keys::{SigningMaterial, VerificationMaterial};
use crate::signing::token::TokenScheme;
use serde::{Deserialize, Serialize};

/// Which scheme produced a signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemeKind {
    /// Raw Ed25519 signature over the canonical bytes
    Detached,
    /// Compact signed token carrying the payload hash
    Token,
}

impl std::fmt::Display for SchemeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemeKind::Detached => write!(f, "detached"),
            SchemeKind::Token => write!(f, "token"),
        }
    }
}

/// Sign and verify capability over raw bytes.
pub trait SignatureScheme: Send + Sync {
    fn kind(&self) -> SchemeKind;

    /// Produce signature bytes over `message` on behalf of `signer`.
    fn sign(&self, message: &[u8], signer: &str, key: &SigningMaterial) -> Result<Vec<u8>>;

    /// Check `signature` against `message`. Never errors: anything wrong is `false`.
    fn verify(&self, message: &[u8], signature: &[u8], key: &VerificationMaterial) -> bool;
}

/// Scheme implementation for a kind. Verification only needs the kind, the
/// token carries its own algorithm.
pub fn scheme_for_kind(kind: SchemeKind) -> Box<dyn SignatureScheme> {
    match kind {
        SchemeKind::Detached => Box::new(DetachedScheme),
        SchemeKind::Token => Box::new(TokenScheme::default()),
    }
}

/// A signature bound to one decision record version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub record_id: RecordId,
    pub scheme: SchemeKind,
    pub signer_identity: String,
    #[serde(with = "b64")]
    pub signature_bytes: Vec<u8>,
}

mod b64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}
