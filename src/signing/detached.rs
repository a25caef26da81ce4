//! Detached Ed25519 signatures over canonical bytes.

use crate::core::{Error, Result};
use crate::signing::keys::{SigningMaterial, VerificationMaterial};
use crate::signing::scheme::{SchemeKind, SignatureScheme};
use ed25519_dalek::{Signature, Signer, Verifier};
use tracing::debug;

/// Ed25519 detached signature scheme.
#[derive(Clone, Copy, Debug, Default)]
pub struct DetachedScheme;

impl SignatureScheme for DetachedScheme {
    fn kind(&self) -> SchemeKind {
        SchemeKind::Detached
    }

    fn sign(&self, message: &[u8], _signer: &str, key: &SigningMaterial) -> Result<Vec<u8>> {
        match key {
            SigningMaterial::Ed25519(signing_key) => {
                Ok(signing_key.sign(message).to_bytes().to_vec())
            }
            SigningMaterial::Hmac(_) => Err(Error::InvalidKeyFormat(
                "detached scheme requires an Ed25519 key".into(),
            )),
        }
    }

    fn verify(&self, message: &[u8], signature: &[u8], key: &VerificationMaterial) -> bool {
        let VerificationMaterial::Ed25519(public_key) = key else {
            debug!("detached verify with non-Ed25519 key");
            return false;
        };
        let Ok(sig_bytes) = <[u8; 64]>::try_from(signature) else {
            debug!(len = signature.len(), "detached signature has wrong length");
            return false;
        };
        let sig = Signature::from_bytes(&sig_bytes);
        public_key.verify(message, &sig).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypair(seed: u8) -> (SigningMaterial, VerificationMaterial) {
        let key = SigningMaterial::ed25519_from_bytes(&[seed; 32]);
        let public = key.verification();
        (key, public)
    }

    #[test]
    fn test_sign_and_verify() {
        let (key, public) = keypair(1);
        let message = b"{\"a\":1}";
        let sig = DetachedScheme.sign(message, "alice", &key).unwrap();
        assert_eq!(sig.len(), 64);
        assert!(DetachedScheme.verify(message, &sig, &public));
    }

    #[test]
    fn test_mismatched_key_fails() {
        let (key, _) = keypair(1);
        let (_, other) = keypair(2);
        let sig = DetachedScheme.sign(b"payload", "alice", &key).unwrap();
        assert!(!DetachedScheme.verify(b"payload", &sig, &other));
    }

    #[test]
    fn test_single_byte_alteration_fails() {
        let (key, public) = keypair(1);
        let message = b"{\"a\":1}".to_vec();
        let sig = DetachedScheme.sign(&message, "alice", &key).unwrap();
        let mut altered = message.clone();
        altered[5] = b'2';
        assert!(!DetachedScheme.verify(&altered, &sig, &public));
    }

    #[test]
    fn test_malformed_signature_fails_closed() {
        let (_, public) = keypair(1);
        assert!(!DetachedScheme.verify(b"payload", &[0u8; 10], &public));
        assert!(!DetachedScheme.verify(b"payload", &[], &public));
        assert!(!DetachedScheme.verify(b"payload", &[0u8; 64], &VerificationMaterial::Hmac(vec![1])));
    }

    #[test]
    fn test_hmac_key_rejected_for_signing() {
        let result = DetachedScheme.sign(b"payload", "alice", &SigningMaterial::Hmac(b"k".to_vec()));
        assert!(matches!(result, Err(Error::InvalidKeyFormat(_))));
    }
}
