//! The closed value model accepted by the canonicalizer.

use crate::core::{Error, Result};
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// A numeric scalar as produced by some upstream encoder.
///
/// Integral floats and integers of the same magnitude share one canonical
/// form; see [`crate::canon::canonicalize`]. Equality follows the canonical
/// form, so `Float(1.0) == Int(1)` and values reloaded from canonical bytes
/// compare equal to the originals.
#[derive(Clone, Copy, Debug)]
pub enum Number {
    Int(i64),
    UInt(u64),
    Float(f64),
}

/// The number as the encoder will render it.
#[derive(PartialEq)]
enum CanonicalNumber {
    Integer(i128),
    Float(f64),
}

impl Number {
    fn canonical(&self) -> CanonicalNumber {
        match *self {
            Number::Int(i) => CanonicalNumber::Integer(i128::from(i)),
            Number::UInt(u) => CanonicalNumber::Integer(i128::from(u)),
            Number::Float(f)
                if f.is_finite()
                    && f.fract() == 0.0
                    && f >= i64::MIN as f64
                    && f < u64::MAX as f64 =>
            {
                CanonicalNumber::Integer(f as i128)
            }
            Number::Float(f) => CanonicalNumber::Float(f),
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

/// Any structured value admissible for canonicalization.
///
/// Mappings are kept in a `BTreeMap`, so insertion order never leaks into
/// the canonical form and keys are unique by construction.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum CanonicalValue {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Sequence(Vec<CanonicalValue>),
    Mapping(BTreeMap<String, CanonicalValue>),
}

impl CanonicalValue {
    /// An empty mapping.
    pub fn mapping() -> Self {
        CanonicalValue::Mapping(BTreeMap::new())
    }

    /// Add an entry to a mapping value. No-op on non-mappings.
    pub fn with_entry(mut self, key: &str, value: impl Into<CanonicalValue>) -> Self {
        if let CanonicalValue::Mapping(map) = &mut self {
            map.insert(key.to_string(), value.into());
        }
        self
    }

    /// Parse JSON text into a value.
    ///
    /// Duplicate keys inside one object are rejected rather than resolved
    /// last-wins.
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::canonicalization("$", e.to_string()))
    }

    /// Parse JSON bytes into a value.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::canonicalization("$", e.to_string()))
    }

    /// Human-readable kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            CanonicalValue::Null => "null",
            CanonicalValue::Bool(_) => "bool",
            CanonicalValue::Number(_) => "number",
            CanonicalValue::String(_) => "string",
            CanonicalValue::Sequence(_) => "sequence",
            CanonicalValue::Mapping(_) => "mapping",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CanonicalValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CanonicalValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view; integral floats are accepted.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            CanonicalValue::Number(Number::UInt(u)) => Some(*u),
            CanonicalValue::Number(Number::Int(i)) => u64::try_from(*i).ok(),
            CanonicalValue::Number(Number::Float(f))
                if f.is_finite() && f.fract() == 0.0 && *f >= 0.0 && *f < u64::MAX as f64 =>
            {
                Some(*f as u64)
            }
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[CanonicalValue]> {
        match self {
            CanonicalValue::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&BTreeMap<String, CanonicalValue>> {
        match self {
            CanonicalValue::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a key in a mapping value.
    pub fn get(&self, key: &str) -> Option<&CanonicalValue> {
        self.as_mapping().and_then(|m| m.get(key))
    }
}

impl From<bool> for CanonicalValue {
    fn from(b: bool) -> Self {
        CanonicalValue::Bool(b)
    }
}

impl From<i64> for CanonicalValue {
    fn from(i: i64) -> Self {
        CanonicalValue::Number(Number::Int(i))
    }
}

impl From<i32> for CanonicalValue {
    fn from(i: i32) -> Self {
        CanonicalValue::Number(Number::Int(i as i64))
    }
}

impl From<u64> for CanonicalValue {
    fn from(u: u64) -> Self {
        CanonicalValue::Number(Number::UInt(u))
    }
}

impl From<usize> for CanonicalValue {
    fn from(u: usize) -> Self {
        CanonicalValue::Number(Number::UInt(u as u64))
    }
}

impl From<f64> for CanonicalValue {
    fn from(f: f64) -> Self {
        CanonicalValue::Number(Number::Float(f))
    }
}

impl From<&str> for CanonicalValue {
    fn from(s: &str) -> Self {
        CanonicalValue::String(s.to_string())
    }
}

impl From<String> for CanonicalValue {
    fn from(s: String) -> Self {
        CanonicalValue::String(s)
    }
}

impl<T: Into<CanonicalValue>> From<Option<T>> for CanonicalValue {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(CanonicalValue::Null)
    }
}

impl From<Vec<CanonicalValue>> for CanonicalValue {
    fn from(items: Vec<CanonicalValue>) -> Self {
        CanonicalValue::Sequence(items)
    }
}

impl From<BTreeMap<String, CanonicalValue>> for CanonicalValue {
    fn from(map: BTreeMap<String, CanonicalValue>) -> Self {
        CanonicalValue::Mapping(map)
    }
}

impl From<serde_json::Value> for CanonicalValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => CanonicalValue::Null,
            Value::Bool(b) => CanonicalValue::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    CanonicalValue::Number(Number::Int(i))
                } else if let Some(u) = n.as_u64() {
                    CanonicalValue::Number(Number::UInt(u))
                } else {
                    CanonicalValue::Number(Number::Float(n.as_f64().unwrap_or(f64::NAN)))
                }
            }
            Value::String(s) => CanonicalValue::String(s),
            Value::Array(items) => {
                CanonicalValue::Sequence(items.into_iter().map(Into::into).collect())
            }
            Value::Object(map) => {
                CanonicalValue::Mapping(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl Serialize for CanonicalValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            CanonicalValue::Null => serializer.serialize_unit(),
            CanonicalValue::Bool(b) => serializer.serialize_bool(*b),
            CanonicalValue::Number(Number::Int(i)) => serializer.serialize_i64(*i),
            CanonicalValue::Number(Number::UInt(u)) => serializer.serialize_u64(*u),
            CanonicalValue::Number(Number::Float(f)) => serializer.serialize_f64(*f),
            CanonicalValue::String(s) => serializer.serialize_str(s),
            CanonicalValue::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            CanonicalValue::Mapping(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for CanonicalValue {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = CanonicalValue;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a JSON value")
            }

            fn visit_bool<E>(self, v: bool) -> std::result::Result<Self::Value, E> {
                Ok(CanonicalValue::Bool(v))
            }

            fn visit_i64<E>(self, v: i64) -> std::result::Result<Self::Value, E> {
                Ok(CanonicalValue::Number(Number::Int(v)))
            }

            fn visit_u64<E>(self, v: u64) -> std::result::Result<Self::Value, E> {
                Ok(match i64::try_from(v) {
                    Ok(i) => CanonicalValue::Number(Number::Int(i)),
                    Err(_) => CanonicalValue::Number(Number::UInt(v)),
                })
            }

            fn visit_f64<E>(self, v: f64) -> std::result::Result<Self::Value, E> {
                Ok(CanonicalValue::Number(Number::Float(v)))
            }

            fn visit_str<E>(self, v: &str) -> std::result::Result<Self::Value, E> {
                Ok(CanonicalValue::String(v.to_string()))
            }

            fn visit_string<E>(self, v: String) -> std::result::Result<Self::Value, E> {
                Ok(CanonicalValue::String(v))
            }

            fn visit_none<E>(self) -> std::result::Result<Self::Value, E> {
                Ok(CanonicalValue::Null)
            }

            fn visit_unit<E>(self) -> std::result::Result<Self::Value, E> {
                Ok(CanonicalValue::Null)
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut items = Vec::new();
                while let Some(item) = seq.next_element()? {
                    items.push(item);
                }
                Ok(CanonicalValue::Sequence(items))
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = BTreeMap::new();
                while let Some(key) = map.next_key::<String>()? {
                    let value = map.next_value()?;
                    if entries.contains_key(&key) {
                        return Err(de::Error::custom(format!("duplicate key '{key}'")));
                    }
                    entries.insert(key, value);
                }
                Ok(CanonicalValue::Mapping(entries))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

/// Convert any serializable type into a canonical value.
///
/// Callers must only pass types whose floats are finite; serde_json maps
/// non-finite floats to `null`.
pub fn to_canonical<T: serde::Serialize>(value: &T) -> Result<CanonicalValue> {
    let json = serde_json::to_value(value)?;
    Ok(json.into())
}

/// Rebuild a typed value from its canonical value.
pub fn from_canonical<T: serde::de::DeserializeOwned>(value: &CanonicalValue) -> Result<T> {
    let json = serde_json::to_value(value)?;
    serde_json::from_value(json).map_err(|e| Error::DeserializationError(e.to_string()))
}
