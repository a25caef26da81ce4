//! Key material and the identity-keyed key source.
//!
//! The core never generates or persists keys; a [`KeySource`] hands out
//! material by identity reference.

use crate::core::{Error, Result};
use ed25519_dalek::{SigningKey, VerifyingKey};
use std::collections::HashMap;
use std::sync::RwLock;

/// Private material used to produce a signature.
#[derive(Clone)]
pub enum SigningMaterial {
    /// Ed25519 private key
    Ed25519(SigningKey),
    /// Shared HMAC secret
    Hmac(Vec<u8>),
}

impl SigningMaterial {
    /// Ed25519 key from its 32 secret bytes.
    pub fn ed25519_from_bytes(bytes: &[u8; 32]) -> Self {
        SigningMaterial::Ed25519(SigningKey::from_bytes(bytes))
    }

    /// Matching verification material.
    pub fn verification(&self) -> VerificationMaterial {
        match self {
            SigningMaterial::Ed25519(key) => VerificationMaterial::Ed25519(key.verifying_key()),
            SigningMaterial::Hmac(secret) => VerificationMaterial::Hmac(secret.clone()),
        }
    }
}

impl std::fmt::Debug for SigningMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SigningMaterial::Ed25519(key) => f
                .debug_tuple("Ed25519")
                .field(&hex::encode(key.verifying_key().to_bytes()))
                .finish(),
            SigningMaterial::Hmac(_) => f.debug_tuple("Hmac").field(&"<redacted>").finish(),
        }
    }
}

/// Public (or shared) material used to check a signature.
#[derive(Clone)]
pub enum VerificationMaterial {
    /// Ed25519 public key
    Ed25519(VerifyingKey),
    /// Shared HMAC secret
    Hmac(Vec<u8>),
}

impl VerificationMaterial {
    /// Ed25519 public key from its 32 bytes.
    pub fn ed25519_from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        VerifyingKey::from_bytes(bytes)
            .map(VerificationMaterial::Ed25519)
            .map_err(|e| Error::InvalidKeyFormat(e.to_string()))
    }
}

impl std::fmt::Debug for VerificationMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerificationMaterial::Ed25519(key) => f
                .debug_tuple("Ed25519")
                .field(&hex::encode(key.to_bytes()))
                .finish(),
            VerificationMaterial::Hmac(_) => f.debug_tuple("Hmac").field(&"<redacted>").finish(),
        }
    }
}

/// Supplies key material by identity reference.
pub trait KeySource: Send + Sync {
    /// Private material for signing as `identity`.
    fn signing_material(&self, identity: &str) -> Result<SigningMaterial>;

    /// Material for verifying signatures made by `identity`.
    fn verification_material(&self, identity: &str) -> Result<VerificationMaterial>;
}

/// Key source backed by in-process maps.
#[derive(Default)]
pub struct InMemoryKeyring {
    signing: RwLock<HashMap<String, SigningMaterial>>,
    verifying: RwLock<HashMap<String, VerificationMaterial>>,
}

impl InMemoryKeyring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register private material; its public half is registered too.
    pub fn insert_signing(&self, identity: &str, material: SigningMaterial) -> Result<()> {
        let public = material.verification();
        self.signing
            .write()
            .map_err(|_| Error::Internal("keyring lock poisoned".into()))?
            .insert(identity.to_string(), material);
        self.insert_verification(identity, public)
    }

    /// Register verify-only material.
    pub fn insert_verification(&self, identity: &str, material: VerificationMaterial) -> Result<()> {
        self.verifying
            .write()
            .map_err(|_| Error::Internal("keyring lock poisoned".into()))?
            .insert(identity.to_string(), material);
        Ok(())
    }

    /// Builder form of [`insert_signing`](Self::insert_signing).
    pub fn with_signing(self, identity: &str, material: SigningMaterial) -> Result<Self> {
        self.insert_signing(identity, material)?;
        Ok(self)
    }

    /// Builder form of [`insert_verification`](Self::insert_verification).
    pub fn with_verification(self, identity: &str, material: VerificationMaterial) -> Result<Self> {
        self.insert_verification(identity, material)?;
        Ok(self)
    }
}

impl KeySource for InMemoryKeyring {
    fn signing_material(&self, identity: &str) -> Result<SigningMaterial> {
        self.signing
            .read()
            .map_err(|_| Error::Internal("keyring lock poisoned".into()))?
            .get(identity)
            .cloned()
            .ok_or_else(|| Error::KeyNotFound(identity.to_string()))
    }

    fn verification_material(&self, identity: &str) -> Result<VerificationMaterial> {
        self.verifying
            .read()
            .map_err(|_| Error::Internal("keyring lock poisoned".into()))?
            .get(identity)
            .cloned()
            .ok_or_else(|| Error::KeyNotFound(identity.to_string()))
    }
}
