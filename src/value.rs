//! Three-valued attribute representation and the attribute codec.
//!
//! The host sends every attribute as known, unknown or null. On the wire the
//! unknown state is the string [`UNKNOWN_VALUE`]; null is JSON `null` or an
//! absent key. [`AttrValue`] carries all three through typed handler models.
//!
//! Codec rules:
//! - request bodies only ever carry known values ([`AttrValue::to_request`]);
//! - response fields become known when present, null when absent or JSON null
//!   ([`AttrValue::from_response`]); empty strings stay empty strings unless a
//!   handler opts into [`empty_as_null`].

use std::fmt;

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::schema::Diagnostic;

/// Wire sentinel for a value the host has not computed yet.
pub const UNKNOWN_VALUE: &str = "74D93920-ED26-11E3-AC10-0800200C9A66";

/// Returns the JSON encoding of an unknown value.
pub fn unknown() -> Value {
    Value::String(UNKNOWN_VALUE.to_string())
}

/// Whether a JSON value is the unknown sentinel.
pub fn is_unknown(value: &Value) -> bool {
    matches!(value, Value::String(s) if s == UNKNOWN_VALUE)
}

/// Whether a JSON value contains the unknown sentinel at any depth.
pub fn contains_unknown(value: &Value) -> bool {
    match value {
        Value::String(_) => is_unknown(value),
        Value::Array(items) => items.iter().any(contains_unknown),
        Value::Object(fields) => fields.values().any(contains_unknown),
        _ => false,
    }
}

/// A host attribute value: known, unknown, or explicitly null.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AttrValue<T> {
    /// A concrete value.
    Known(T),
    /// Not yet known at plan time.
    Unknown,
    /// Explicitly null or absent.
    #[default]
    Null,
}

impl<T> AttrValue<T> {
    /// Whether a concrete value is present.
    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    /// Whether the value is unknown.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Whether the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the known value.
    pub fn as_known(&self) -> Option<&T> {
        match self {
            Self::Known(v) => Some(v),
            _ => None,
        }
    }

    /// Take the known value.
    pub fn known(self) -> Option<T> {
        match self {
            Self::Known(v) => Some(v),
            _ => None,
        }
    }

    /// Map the known value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> AttrValue<U> {
        match self {
            Self::Known(v) => AttrValue::Known(f(v)),
            Self::Unknown => AttrValue::Unknown,
            Self::Null => AttrValue::Null,
        }
    }

    /// Response field to state: present becomes known, absent becomes null.
    pub fn from_response(value: Option<T>) -> Self {
        value.map_or(Self::Null, Self::Known)
    }

    /// Keep `self` unless it is null, in which case use `prior`.
    pub fn or_prior(self, prior: Self) -> Self {
        match self {
            Self::Null => prior,
            other => other,
        }
    }

    /// Replace unknown with null. Used when committing state.
    pub fn resolve_unknown(self) -> Self {
        match self {
            Self::Unknown => Self::Null,
            other => other,
        }
    }
}

impl<T: Clone> AttrValue<T> {
    /// Plan/state value to request field: only known values are sent.
    pub fn to_request(&self) -> Option<T> {
        self.as_known().cloned()
    }
}

impl AttrValue<String> {
    /// Borrow a known string.
    pub fn as_str(&self) -> Option<&str> {
        self.as_known().map(String::as_str)
    }

    /// Build a known string value.
    pub fn string(value: impl Into<String>) -> Self {
        Self::Known(value.into())
    }
}

impl<T> From<Option<T>> for AttrValue<T> {
    fn from(value: Option<T>) -> Self {
        Self::from_response(value)
    }
}

impl<T: Serialize> Serialize for AttrValue<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Known(v) => v.serialize(serializer),
            Self::Unknown => serializer.serialize_str(UNKNOWN_VALUE),
            Self::Null => serializer.serialize_none(),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for AttrValue<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        if raw.is_null() {
            return Ok(Self::Null);
        }
        if is_unknown(&raw) {
            return Ok(Self::Unknown);
        }
        serde_json::from_value(raw)
            .map(Self::Known)
            .map_err(D::Error::custom)
    }
}

/// Response string to state, treating the empty string as null.
pub fn empty_as_null(value: Option<String>) -> AttrValue<String> {
    match value {
        Some(s) if !s.is_empty() => AttrValue::Known(s),
        _ => AttrValue::Null,
    }
}

/// Wrapper for secrets. Debug output is redacted and equality diagnostics
/// never see the inner value.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Sensitive<T>(T);

impl<T> Sensitive<T> {
    /// Wrap a secret.
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Borrow the secret. Callers must not log the result.
    pub fn expose(&self) -> &T {
        &self.0
    }

    /// Unwrap the secret.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl<T: Serialize> Serialize for Sensitive<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Sensitive<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(Self)
    }
}

/// Remap a returned list into the configuration-declared order.
///
/// Returned items are matched to configured items by `key`. Configured items
/// missing from the response keep their configured value; returned items the
/// configuration does not mention are dropped.
pub fn order_by_config<T, K, F>(configured: &[T], returned: Vec<T>, key: F) -> Vec<T>
where
    T: Clone,
    K: Eq + std::hash::Hash,
    F: Fn(&T) -> K,
{
    let mut by_key: std::collections::HashMap<K, T> =
        returned.into_iter().map(|item| (key(&item), item)).collect();
    configured
        .iter()
        .map(|item| by_key.remove(&key(item)).unwrap_or_else(|| item.clone()))
        .collect()
}

/// Decode a host object into a typed model.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, Diagnostic> {
    let value = if value.is_null() {
        Value::Object(Default::default())
    } else {
        value
    };
    serde_json::from_value(value).map_err(|e| {
        Diagnostic::error("Invalid State")
            .with_detail(format!("Unable to decode attribute values: {}", e))
    })
}

/// Encode a typed model into a host object.
pub fn encode<T: Serialize>(model: &T) -> Result<Value, Diagnostic> {
    serde_json::to_value(model).map_err(|e| {
        Diagnostic::error("Invalid State")
            .with_detail(format!("Unable to encode attribute values: {}", e))
    })
}
