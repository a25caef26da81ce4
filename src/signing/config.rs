//! Signer configuration.

use crate::signing::detached::DetachedScheme;
use crate::signing::keys::KeySource;
use crate::signing::scheme::SignatureScheme;
use crate::signing::signer::RecordSigner;
use crate::signing::token::{TokenAlgorithm, TokenScheme};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which signature scheme new signatures use.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum SignerConfig {
    /// Ed25519 detached signatures
    #[default]
    Detached,
    /// Compact signed tokens
    Token {
        #[serde(default)]
        algorithm: TokenAlgorithm,
    },
}

impl SignerConfig {
    /// Scheme instance for this configuration.
    pub fn scheme(&self) -> Box<dyn SignatureScheme> {
        match self {
            SignerConfig::Detached => Box::new(DetachedScheme),
            SignerConfig::Token { algorithm } => Box::new(TokenScheme::new(*algorithm)),
        }
    }

    /// Build a signer over `keys`.
    pub fn build(&self, keys: Arc<dyn KeySource>) -> RecordSigner {
        RecordSigner::new(self.scheme(), keys)
    }
}
