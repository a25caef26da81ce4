//! Signing Module
//!
//! Binds signatures to the exact canonical bytes of a decision record:
//! - Detached Ed25519 signatures
//! - Compact signed tokens (HS256 or EdDSA)
//! - Identity-keyed key sources
//! - Fail-closed verification

pub mod config;
pub mod detached;
pub mod keys;
pub mod scheme;
pub mod signer;
pub mod token;

pub use config::SignerConfig;
pub use detached::DetachedScheme;
pub use keys::{InMemoryKeyring, KeySource, SigningMaterial, VerificationMaterial};
pub use scheme::{scheme_for_kind, SchemeKind, Signature, SignatureScheme};
pub use signer::RecordSigner;
pub use token::{
    sign_token, verify_token, verify_token_for, TokenAlgorithm, TokenClaims, TokenScheme,
    TokenVerification,
};
