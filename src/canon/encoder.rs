//! Canonical byte encoding and content hashing.
//!
//! The canonical form is compact JSON with these rules:
//!
//! 1. Mapping keys are sorted by the byte order of their UTF-8 encoding.
//! 2. No whitespace between tokens, no trailing newline.
//! 3. Integral numbers render as plain integers (`1.0` and `1` are both `1`);
//!    other finite floats use the shortest round-trip digits without an
//!    exponent; `-0` renders as `0`.
//! 4. Strings escape only `"`, `\` and U+0000..=U+001F, using the short
//!    escapes where one exists and `\u00xx` otherwise.
//!
//! Non-finite numbers and structures nested deeper than [`MAX_DEPTH`]
//! have no canonical form and fail with [`Error::Canonicalization`].

use crate::canon::value::{CanonicalValue, Number};
use crate::core::{ContentHash, Error, Result};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Maximum nesting depth accepted by the encoder.
pub const MAX_DEPTH: usize = 128;

/// The unique byte sequence for a canonical value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The canonical text. Always valid UTF-8.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse the bytes back into a value.
    pub fn parse(&self) -> Result<CanonicalValue> {
        CanonicalValue::from_json_slice(&self.0)
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Produce the canonical bytes for a value.
pub fn canonicalize(value: &CanonicalValue) -> Result<CanonicalBytes> {
    let mut out = String::new();
    emit_value(value, "$", 0, &mut out)?;
    Ok(CanonicalBytes(out.into_bytes()))
}

/// Hash canonical bytes.
pub fn hash(bytes: &CanonicalBytes) -> ContentHash {
    sha256(bytes.as_bytes())
}

/// Canonicalize and hash in one step.
pub fn canonical_hash(value: &CanonicalValue) -> Result<ContentHash> {
    Ok(hash(&canonicalize(value)?))
}

/// Compute SHA-256 of raw data.
pub fn sha256(data: &[u8]) -> ContentHash {
    let digest = Sha256::digest(data);
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&digest);
    ContentHash::new(bytes)
}

/// Canonicalize JSON text. Idempotent on its own output.
pub fn canonicalize_json(text: &str) -> Result<String> {
    let value = CanonicalValue::from_json_str(text)?;
    let bytes = canonicalize(&value)?;
    Ok(bytes.as_str().to_string())
}

/// Whether two JSON texts denote the same canonical value.
///
/// Any parse or canonicalization failure on either side yields `false`.
pub fn verify_canonicalization(original: &str, candidate: &str) -> bool {
    match (canonicalize_json(original), canonicalize_json(candidate)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn emit_value(value: &CanonicalValue, path: &str, depth: usize, out: &mut String) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(Error::canonicalization(
            path,
            format!("nesting exceeds {MAX_DEPTH} levels"),
        ));
    }
    match value {
        CanonicalValue::Null => out.push_str("null"),
        CanonicalValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        CanonicalValue::Number(n) => emit_number(n, path, out)?,
        CanonicalValue::String(s) => emit_string(s, out),
        CanonicalValue::Sequence(items) => emit_sequence(items, path, depth, out)?,
        CanonicalValue::Mapping(map) => emit_mapping(map, path, depth, out)?,
    }
    Ok(())
}

fn emit_number(n: &Number, path: &str, out: &mut String) -> Result<()> {
    match *n {
        Number::Int(i) => {
            let _ = write!(out, "{i}");
        }
        Number::UInt(u) => {
            let _ = write!(out, "{u}");
        }
        Number::Float(f) => {
            if !f.is_finite() {
                return Err(Error::canonicalization(
                    path,
                    format!("non-finite number {f} has no canonical form"),
                ));
            }
            if f == 0.0 {
                out.push('0');
            } else if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                let _ = write!(out, "{}", f as i64);
            } else if f.fract() == 0.0 && f > 0.0 && f < u64::MAX as f64 {
                let _ = write!(out, "{}", f as u64);
            } else {
                // f64's Display never uses exponent notation and prints the
                // shortest digits that round-trip.
                let _ = write!(out, "{f}");
            }
        }
    }
    Ok(())
}

fn emit_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000C}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if ('\u{0000}'..='\u{001F}').contains(&c) => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

fn emit_sequence(
    items: &[CanonicalValue],
    path: &str,
    depth: usize,
    out: &mut String,
) -> Result<()> {
    out.push('[');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        emit_value(item, &format!("{path}[{i}]"), depth + 1, out)?;
    }
    out.push(']');
    Ok(())
}

fn emit_mapping(
    map: &BTreeMap<String, CanonicalValue>,
    path: &str,
    depth: usize,
    out: &mut String,
) -> Result<()> {
    // BTreeMap<String, _> iterates in byte-wise key order.
    out.push('{');
    for (i, (key, value)) in map.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        emit_string(key, out);
        out.push(':');
        emit_value(value, &format!("{path}.{key}"), depth + 1, out)?;
    }
    out.push('}');
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn canon(text: &str) -> String {
        canonicalize_json(text).unwrap()
    }

    #[test]
    fn test_sorts_keys() {
        assert_eq!(canon(r#"{"z": 1, "a": 2, "m": 3}"#), r#"{"a":2,"m":3,"z":1}"#);
    }

    #[test]
    fn test_sorts_nested_keys() {
        assert_eq!(
            canon(r#"{"outer": {"z": "last", "a": "first"}, "alpha": 1}"#),
            r#"{"alpha":1,"outer":{"a":"first","z":"last"}}"#
        );
    }

    #[test]
    fn test_keys_sort_bytewise() {
        // 'B' (0x42) < 'a' (0x61) < 'é' (0xC3 0xA9)
        assert_eq!(canon(r#"{"é": 1, "a": 2, "B": 3}"#), r#"{"B":3,"a":2,"é":1}"#);
    }

    #[test]
    fn test_sequences_keep_order() {
        assert_eq!(canon(r#"{"items": [3, 1, 2]}"#), r#"{"items":[3,1,2]}"#);
    }

    #[test]
    fn test_empty_containers() {
        assert_eq!(canon("{}"), "{}");
        assert_eq!(canon("[]"), "[]");
        assert_eq!(canon(r#"{"items": []}"#), r#"{"items":[]}"#);
    }

    #[test]
    fn test_number_normalization() {
        assert_eq!(canon("1.0"), "1");
        assert_eq!(canon("1.50"), "1.5");
        assert_eq!(canon("1e3"), "1000");
        assert_eq!(canon("-0.0"), "0");
        assert_eq!(canon("2.5e-7"), "0.00000025");
        assert_eq!(canon("3.14"), "3.14");
        assert_eq!(canon("18446744073709551615"), "18446744073709551615");
        assert_eq!(canon("-42"), "-42");
    }

    #[test]
    fn test_integral_float_matches_integer() {
        let a = CanonicalValue::from(7i64);
        let b = CanonicalValue::from(7.0);
        assert_eq!(canonicalize(&a).unwrap(), canonicalize(&b).unwrap());
    }

    #[test]
    fn test_rejects_non_finite_with_path() {
        let value = CanonicalValue::mapping().with_entry(
            "data",
            CanonicalValue::Sequence(vec![CanonicalValue::from(1i64), CanonicalValue::from(f64::NAN)]),
        );
        match canonicalize(&value).unwrap_err() {
            Error::Canonicalization { path, .. } => assert_eq!(path, "$.data[1]"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(canonicalize(&CanonicalValue::from(f64::INFINITY)).is_err());
    }

    #[test]
    fn test_rejects_excessive_depth() {
        let mut value = CanonicalValue::Null;
        for _ in 0..(MAX_DEPTH + 2) {
            value = CanonicalValue::Sequence(vec![value]);
        }
        assert!(matches!(canonicalize(&value), Err(Error::Canonicalization { .. })));
    }

    #[test]
    fn test_string_escaping() {
        let value = CanonicalValue::from("quote\" slash\\ nl\n tab\t bell\u{0007} del\u{007f}");
        let bytes = canonicalize(&value).unwrap();
        assert_eq!(
            bytes.as_str(),
            "\"quote\\\" slash\\\\ nl\\n tab\\t bell\\u0007 del\u{007f}\""
        );
    }

    #[test]
    fn test_unicode_passthrough() {
        assert_eq!(canon(r#"{"message": "Hello 世界"}"#), "{\"message\":\"Hello 世界\"}");
    }

    #[test]
    fn test_no_whitespace_or_newline() {
        let out = canon("{\n  \"a\" : [ 1 , 2 ]\n}\n");
        assert_eq!(out, r#"{"a":[1,2]}"#);
    }

    #[test]
    fn test_idempotent() {
        let once = canon(r#"{"z": 1, "a": {"c": [1.0, "x"], "b": null}}"#);
        assert_eq!(canon(&once), once);
    }

    #[test]
    fn test_hash_is_sha256_hex() {
        let h1 = canonical_hash(&CanonicalValue::from_json_str(r#"{"z":1,"a":2}"#).unwrap()).unwrap();
        let h2 = canonical_hash(&CanonicalValue::from_json_str(r#"{"a":2,"z":1}"#).unwrap()).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(h1.to_hex().len(), 64);
        // sha256("{}")
        assert_eq!(
            canonical_hash(&CanonicalValue::mapping()).unwrap().to_hex(),
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }

    #[test]
    fn test_distinct_values_distinct_hashes() {
        let h1 = canonical_hash(&CanonicalValue::from_json_str(r#"{"a":1,"b":2}"#).unwrap()).unwrap();
        let h2 = canonical_hash(&CanonicalValue::from_json_str(r#"{"a":1,"b":3}"#).unwrap()).unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_verify_canonicalization() {
        assert!(verify_canonicalization(r#"{"b": 2, "a": 1}"#, r#"{"a": 1, "b": 2}"#));
        assert!(!verify_canonicalization(r#"{"a": 1, "b": 2}"#, r#"{"a": 1, "b": 3}"#));
        assert!(!verify_canonicalization("{", "{}"));
    }

    fn arb_value() -> impl Strategy<Value = CanonicalValue> {
        let leaf = prop_oneof![
            Just(CanonicalValue::Null),
            any::<bool>().prop_map(CanonicalValue::Bool),
            any::<i64>().prop_map(CanonicalValue::from),
            (-1_000_000i32..1_000_000i32).prop_map(|i| CanonicalValue::from(i as f64 / 8.0)),
            "[a-zA-Z0-9 \"\\\\\n\u{e9}]{0,8}".prop_map(CanonicalValue::String),
        ];
        leaf.prop_recursive(4, 32, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(CanonicalValue::Sequence),
                prop::collection::btree_map("[a-z]{0,4}", inner, 0..6)
                    .prop_map(CanonicalValue::Mapping),
            ]
        })
    }

    proptest! {
        #[test]
        fn property_reparse_is_stable(value in arb_value()) {
            let bytes = canonicalize(&value).unwrap();
            let reparsed = bytes.parse().unwrap();
            prop_assert_eq!(canonicalize(&reparsed).unwrap(), bytes);
        }

        #[test]
        fn property_key_order_is_irrelevant(
            entries in prop::collection::vec(("[a-z]{1,4}", any::<i32>()), 0..8)
        ) {
            let mut forward = String::from("{");
            let mut backward = String::from("{");
            let mut seen = std::collections::BTreeMap::new();
            for (k, v) in &entries {
                seen.insert(k.clone(), *v);
            }
            let items: Vec<String> = seen.iter().map(|(k, v)| format!("\"{k}\":{v}")).collect();
            forward.push_str(&items.join(","));
            backward.push_str(&items.iter().rev().cloned().collect::<Vec<_>>().join(" , "));
            forward.push('}');
            backward.push('}');
            prop_assert_eq!(canon(&forward), canon(&backward));
        }

        #[test]
        fn property_integral_floats_match_integers(i in -9_007_199_254_740_992i64..9_007_199_254_740_992i64) {
            let as_int = canonicalize(&CanonicalValue::from(i)).unwrap();
            let as_float = canonicalize(&CanonicalValue::from(i as f64)).unwrap();
            prop_assert_eq!(as_int, as_float);
        }
    }
}
