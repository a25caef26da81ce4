//! Canonicalizer
//!
//! Turns a structured value into one deterministic byte sequence and a
//! content hash:
//! - Closed value model (`CanonicalValue`)
//! - Canonical JSON encoding
//! - SHA-256 content hashing

pub mod encoder;
pub mod value;

pub use encoder::{
    canonical_hash, canonicalize, canonicalize_json, hash, sha256, verify_canonicalization,
    CanonicalBytes, MAX_DEPTH,
};
pub use value::{from_canonical, to_canonical, CanonicalValue, Number};
