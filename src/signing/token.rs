//! Compact signed tokens.
//!
//! A token is `b64url(header).b64url(claims).b64url(signature)`. The header
//! names the algorithm and the claims carry the SHA-256 of the signed bytes.
//! Verification against bytes always recomputes that hash; the embedded
//! claim is never trusted on its own.

use crate::canon::{canonicalize, sha256, to_canonical};
use crate::core::{ContentHash, Error, Result};
use crate::signing::keys::{SigningMaterial, VerificationMaterial};
use crate::signing::scheme::{SchemeKind, SignatureScheme};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::{Signer, Verifier};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

const TOKEN_TYPE: &str = "DNT";
const HASH_ALG: &str = "sha-256";

/// Token signing algorithm.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenAlgorithm {
    /// HMAC-SHA256 with a shared secret
    #[default]
    HS256,
    /// Ed25519
    EdDSA,
}

impl TokenAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenAlgorithm::HS256 => "HS256",
            TokenAlgorithm::EdDSA => "EdDSA",
        }
    }

    /// Parse a header `alg`. `none` and anything unknown are refused.
    pub fn from_header(alg: &str) -> Option<Self> {
        match alg {
            "HS256" => Some(TokenAlgorithm::HS256),
            "EdDSA" => Some(TokenAlgorithm::EdDSA),
            _ => None,
        }
    }
}

impl std::fmt::Display for TokenAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    typ: String,
}

/// Claims carried by a token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub hash_alg: String,
    pub payload_hash: ContentHash,
    pub signer: String,
}

/// Outcome of checking a token's own signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenVerification {
    pub valid: bool,
    pub claims: Option<TokenClaims>,
}

impl TokenVerification {
    fn invalid() -> Self {
        Self {
            valid: false,
            claims: None,
        }
    }

    /// Payload hash claimed by a valid token.
    pub fn payload_hash(&self) -> Option<&ContentHash> {
        self.claims.as_ref().map(|c| &c.payload_hash)
    }
}

fn encode_segment<T: Serialize>(value: &T) -> Result<String> {
    let bytes = canonicalize(&to_canonical(value)?)?;
    Ok(URL_SAFE_NO_PAD.encode(bytes.as_bytes()))
}

/// Sign `bytes` into a compact token.
pub fn sign_token(
    bytes: &[u8],
    signer: &str,
    key: &SigningMaterial,
    algorithm: TokenAlgorithm,
) -> Result<String> {
    let header = TokenHeader {
        alg: algorithm.as_str().to_string(),
        typ: TOKEN_TYPE.to_string(),
    };
    let claims = TokenClaims {
        hash_alg: HASH_ALG.to_string(),
        payload_hash: sha256(bytes),
        signer: signer.to_string(),
    };
    let signing_input = format!("{}.{}", encode_segment(&header)?, encode_segment(&claims)?);

    let signature = match (algorithm, key) {
        (TokenAlgorithm::HS256, SigningMaterial::Hmac(secret)) => {
            let mut mac = HmacSha256::new_from_slice(secret)
                .map_err(|e| Error::InvalidKeyFormat(e.to_string()))?;
            mac.update(signing_input.as_bytes());
            mac.finalize().into_bytes().to_vec()
        }
        (TokenAlgorithm::EdDSA, SigningMaterial::Ed25519(signing_key)) => {
            signing_key.sign(signing_input.as_bytes()).to_bytes().to_vec()
        }
        (alg, _) => {
            return Err(Error::InvalidKeyFormat(format!(
                "key type does not match token algorithm {alg}"
            )))
        }
    };

    Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature)))
}

/// Check a token's signature and decode its claims.
///
/// The header algorithm must agree with the key type; a shared secret is
/// never accepted for an Ed25519 token or the other way round.
pub fn verify_token(token: &str, key: &VerificationMaterial) -> TokenVerification {
    let parts: Vec<&str> = token.split('.').collect();
    let [header_b64, claims_b64, sig_b64] = parts.as_slice() else {
        debug!("token does not have three segments");
        return TokenVerification::invalid();
    };

    let Some(header) = URL_SAFE_NO_PAD
        .decode(header_b64)
        .ok()
        .and_then(|raw| serde_json::from_slice::<TokenHeader>(&raw).ok())
    else {
        debug!("token header is malformed");
        return TokenVerification::invalid();
    };
    let Some(algorithm) = TokenAlgorithm::from_header(&header.alg) else {
        debug!(alg = %header.alg, "token algorithm refused");
        return TokenVerification::invalid();
    };
    let Ok(signature) = URL_SAFE_NO_PAD.decode(sig_b64) else {
        return TokenVerification::invalid();
    };

    let signing_input = format!("{header_b64}.{claims_b64}");
    let signature_ok = match (algorithm, key) {
        (TokenAlgorithm::HS256, VerificationMaterial::Hmac(secret)) => {
            match HmacSha256::new_from_slice(secret) {
                Ok(mut mac) => {
                    mac.update(signing_input.as_bytes());
                    mac.verify_slice(&signature).is_ok()
                }
                Err(_) => false,
            }
        }
        (TokenAlgorithm::EdDSA, VerificationMaterial::Ed25519(public_key)) => {
            match <[u8; 64]>::try_from(signature.as_slice()) {
                Ok(sig_bytes) => public_key
                    .verify(
                        signing_input.as_bytes(),
                        &ed25519_dalek::Signature::from_bytes(&sig_bytes),
                    )
                    .is_ok(),
                Err(_) => false,
            }
        }
        (alg, _) => {
            debug!(%alg, "token algorithm does not match key type");
            false
        }
    };
    if !signature_ok {
        return TokenVerification::invalid();
    }

    let Some(claims) = URL_SAFE_NO_PAD
        .decode(claims_b64)
        .ok()
        .and_then(|raw| serde_json::from_slice::<TokenClaims>(&raw).ok())
    else {
        debug!("token claims are malformed");
        return TokenVerification::invalid();
    };
    if claims.hash_alg != HASH_ALG {
        debug!(hash_alg = %claims.hash_alg, "unsupported token hash algorithm");
        return TokenVerification::invalid();
    }

    TokenVerification {
        valid: true,
        claims: Some(claims),
    }
}

/// Verify a token against the bytes under review.
pub fn verify_token_for(token: &str, key: &VerificationMaterial, bytes: &[u8]) -> bool {
    let verification = verify_token(token, key);
    match verification.payload_hash() {
        Some(claimed) if verification.valid => {
            let actual = sha256(bytes);
            bool::from(claimed.as_bytes().ct_eq(actual.as_bytes()))
        }
        _ => false,
    }
}

/// Token scheme; signature bytes are the UTF-8 token.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokenScheme {
    algorithm: TokenAlgorithm,
}

impl TokenScheme {
    pub fn new(algorithm: TokenAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn algorithm(&self) -> TokenAlgorithm {
        self.algorithm
    }
}

impl SignatureScheme for TokenScheme {
    fn kind(&self) -> SchemeKind {
        SchemeKind::Token
    }

    fn sign(&self, message: &[u8], signer: &str, key: &SigningMaterial) -> Result<Vec<u8>> {
        sign_token(message, signer, key, self.algorithm).map(String::into_bytes)
    }

    fn verify(&self, message: &[u8], signature: &[u8], key: &VerificationMaterial) -> bool {
        match std::str::from_utf8(signature) {
            Ok(token) => verify_token_for(token, key, message),
            Err(_) => false,
        }
    }
}
