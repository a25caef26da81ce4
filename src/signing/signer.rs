//! Record signer binding a scheme to a key source.

use crate::core::{Error, Result};
use crate::decision::DecisionRecord;
use crate::signing::keys::KeySource;
use crate::signing::scheme::{scheme_for_kind, SchemeKind, Signature, SignatureScheme};
use crate::signing::token::verify_token;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Signs decision records and verifies their signatures.
pub struct RecordSigner {
    scheme: Box<dyn SignatureScheme>,
    keys: Arc<dyn KeySource>,
}

impl RecordSigner {
    pub fn new(scheme: Box<dyn SignatureScheme>, keys: Arc<dyn KeySource>) -> Self {
        Self { scheme, keys }
    }

    pub fn scheme(&self) -> SchemeKind {
        self.scheme.kind()
    }

    /// Sign the canonical bytes of `record` as `signer_identity`.
    pub fn sign_record(&self, record: &DecisionRecord, signer_identity: &str) -> Result<Signature> {
        if signer_identity.trim().is_empty() {
            return Err(Error::SigningFailed("signer identity must not be empty".into()));
        }
        record.verify_integrity()?;
        let bytes = record.canonical_bytes()?;
        let key = self.keys.signing_material(signer_identity)?;
        let signature_bytes = self.scheme.sign(bytes.as_bytes(), signer_identity, &key)?;

        info!(
            record_id = %record.record_id().short(),
            signer = %signer_identity,
            scheme = %self.scheme.kind(),
            "decision record signed"
        );
        Ok(Signature {
            record_id: record.record_id().clone(),
            scheme: self.scheme.kind(),
            signer_identity: signer_identity.to_string(),
            signature_bytes,
        })
    }

    /// Verify `signature` over `record`. Fails closed to `false`.
    pub fn verify_record(&self, record: &DecisionRecord, signature: &Signature) -> bool {
        if &signature.record_id != record.record_id() {
            debug!(
                record_id = %record.record_id().short(),
                signed_id = %signature.record_id.short(),
                "signature refers to a different record"
            );
            return false;
        }
        if let Err(e) = record.verify_integrity() {
            warn!(record_id = %record.record_id().short(), error = %e, "record failed integrity check");
            return false;
        }
        match record.canonical_bytes() {
            Ok(bytes) => self.verify_bytes(bytes.as_bytes(), signature),
            Err(e) => {
                warn!(error = %e, "record could not be canonicalized");
                false
            }
        }
    }

    /// Verify `signature` over stored canonical bytes.
    pub fn verify_stored(&self, bytes: &[u8], signature: &Signature) -> bool {
        match DecisionRecord::from_canonical_bytes(bytes) {
            Ok(record) => self.verify_record(&record, signature),
            Err(e) => {
                debug!(error = %e, "stored bytes are not a valid record");
                false
            }
        }
    }

    fn verify_bytes(&self, bytes: &[u8], signature: &Signature) -> bool {
        let key = match self.keys.verification_material(&signature.signer_identity) {
            Ok(key) => key,
            Err(e) => {
                debug!(signer = %signature.signer_identity, error = %e, "no verification key");
                return false;
            }
        };

        if signature.scheme == SchemeKind::Token {
            // The token names its signer; it has to be the one on the envelope.
            let claimed = std::str::from_utf8(&signature.signature_bytes)
                .ok()
                .and_then(|token| verify_token(token, &key).claims)
                .map(|claims| claims.signer);
            if claimed.as_deref() != Some(signature.signer_identity.as_str()) {
                return false;
            }
        }

        scheme_for_kind(signature.scheme).verify(bytes, &signature.signature_bytes, &key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canon::{sha256, CanonicalValue};
    use crate::decision::compose_canon_proposal;
    use crate::signing::detached::DetachedScheme;
    use crate::signing::keys::{InMemoryKeyring, SigningMaterial};
    use crate::signing::token::{TokenAlgorithm, TokenScheme};

    fn keyring() -> Arc<InMemoryKeyring> {
        let keyring = InMemoryKeyring::new()
            .with_signing("alice", SigningMaterial::ed25519_from_bytes(&[1u8; 32]))
            .unwrap()
            .with_signing("bob", SigningMaterial::ed25519_from_bytes(&[2u8; 32]))
            .unwrap()
            .with_signing("svc", SigningMaterial::Hmac(b"svc-secret".to_vec()))
            .unwrap();
        Arc::new(keyring)
    }

    fn record() -> DecisionRecord {
        compose_canon_proposal(
            &CanonicalValue::from_json_str(r#"{"title":"Old"}"#).unwrap(),
            CanonicalValue::from_json_str(r#"{"title":"New"}"#).unwrap(),
            "Better title",
            "alice",
        )
        .unwrap()
    }

    #[test]
    fn test_detached_sign_and_verify() {
        let signer = RecordSigner::new(Box::new(DetachedScheme), keyring());
        let record = record();
        let sig = signer.sign_record(&record, "alice").unwrap();
        assert_eq!(sig.scheme, SchemeKind::Detached);
        assert_eq!(&sig.record_id, record.record_id());
        assert!(signer.verify_record(&record, &sig));
    }

    #[test]
    fn test_signature_from_other_identity_fails() {
        let signer = RecordSigner::new(Box::new(DetachedScheme), keyring());
        let record = record();
        let mut sig = signer.sign_record(&record, "alice").unwrap();
        sig.signer_identity = "bob".into();
        assert!(!signer.verify_record(&record, &sig));
    }

    #[test]
    fn test_signature_bound_to_record_id() {
        let signer = RecordSigner::new(Box::new(DetachedScheme), keyring());
        let record = record();
        let mut sig = signer.sign_record(&record, "alice").unwrap();
        sig.record_id = crate::decision::RecordId::new(sha256(b"elsewhere"));
        assert!(!signer.verify_record(&record, &sig));
    }

    #[test]
    fn test_multiple_signatures() {
        let signer = RecordSigner::new(Box::new(DetachedScheme), keyring());
        let record = record();
        let a = signer.sign_record(&record, "alice").unwrap();
        let b = signer.sign_record(&record, "bob").unwrap();
        assert_ne!(a.signature_bytes, b.signature_bytes);
        assert!(signer.verify_record(&record, &a));
        assert!(signer.verify_record(&record, &b));
    }

    #[test]
    fn test_token_scheme_record() {
        let signer = RecordSigner::new(Box::new(TokenScheme::new(TokenAlgorithm::HS256)), keyring());
        let record = record();
        let sig = signer.sign_record(&record, "svc").unwrap();
        assert_eq!(sig.scheme, SchemeKind::Token);
        assert!(signer.verify_record(&record, &sig));
        let bytes = record.canonical_bytes().unwrap();
        assert!(signer.verify_stored(bytes.as_bytes(), &sig));
    }

    #[test]
    fn test_altered_stored_bytes_fail() {
        let signer = RecordSigner::new(Box::new(DetachedScheme), keyring());
        let record = record();
        let sig = signer.sign_record(&record, "alice").unwrap();
        let mut bytes = record.canonical_bytes().unwrap().into_vec();
        let pos = bytes.windows(3).position(|w| w == b"New").unwrap();
        bytes[pos] = b'M';
        assert!(!signer.verify_stored(&bytes, &sig));
    }

    #[test]
    fn test_unknown_signer() {
        let signer = RecordSigner::new(Box::new(DetachedScheme), keyring());
        assert!(matches!(
            signer.sign_record(&record(), "mallory"),
            Err(Error::KeyNotFound(_))
        ));
        assert!(signer.sign_record(&record(), " ").is_err());
    }

    #[test]
    fn test_verifier_accepts_either_scheme() {
        let keys = keyring();
        let detached = RecordSigner::new(Box::new(DetachedScheme), keys.clone());
        let token = RecordSigner::new(Box::new(TokenScheme::new(TokenAlgorithm::HS256)), keys);
        let record = record();
        let sig = token.sign_record(&record, "svc").unwrap();
        assert!(detached.verify_record(&record, &sig));
    }
}
