//! Typed field values and the ordered field map.
//!
//! `FieldValue` is the opaque typed value carried by every tracked column. It
//! mirrors the storage classes of the underlying store (null, integer, real,
//! text, blob) plus booleans. Equality is value equality: `Null == Null`,
//! and values of different variants are never equal.
//!
//! `FieldMap` keeps declaration order. Serialized output follows insertion
//! order exactly, which keeps audit text reproducible for identical inputs.

use std::borrow::Cow;
use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use schemars::{JsonSchema, Schema, SchemaGenerator, json_schema};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::{self, SerializeMap};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Object key used to tag binary values in serialized text.
pub const BLOB_TAG: &str = "$blob";

/// A single column value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl FieldValue {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short name of the variant, used in log fields and placeholder markers.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
        }
    }

    /// Whether this value can be written as JSON without loss.
    ///
    /// Non-finite reals (NaN, infinities) have no JSON representation.
    #[must_use]
    pub fn is_encodable(&self) -> bool {
        match self {
            Self::Real(r) => r.is_finite(),
            _ => true,
        }
    }

    /// Render the value for the `table_pk` column. `Null` has no key text.
    #[must_use]
    pub fn to_key_string(&self) -> Option<String> {
        match self {
            Self::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Change-detection equality. Like `==`, except a real compares equal
    /// to a bit-identical real, so a stored NaN never reads as modified.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Real(a), Self::Real(b)) => a == b || a.to_bits() == b.to_bits(),
            _ => self == other,
        }
    }

    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Real(r) => write!(f, "{r}"),
            Self::Text(s) => f.write_str(s),
            Self::Blob(bytes) => f.write_str(&BASE64.encode(bytes)),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Blob(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Integer(i) => serializer.serialize_i64(*i),
            Self::Real(r) if r.is_finite() => serializer.serialize_f64(*r),
            Self::Real(r) => Err(ser::Error::custom(format!(
                "non-finite real {r} has no JSON representation"
            ))),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Blob(bytes) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(BLOB_TAG, &BASE64.encode(bytes))?;
                map.end()
            }
        }
    }
}

struct FieldValueVisitor;

impl<'de> Visitor<'de> for FieldValueVisitor {
    type Value = FieldValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("null, a boolean, a number, a string, or a tagged blob")
    }

    fn visit_unit<E: de::Error>(self) -> Result<FieldValue, E> {
        Ok(FieldValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<FieldValue, E> {
        Ok(FieldValue::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<FieldValue, D::Error> {
        FieldValue::deserialize(deserializer)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<FieldValue, E> {
        Ok(FieldValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<FieldValue, E> {
        Ok(FieldValue::Integer(v))
    }

    #[allow(clippy::cast_precision_loss)]
    fn visit_u64<E: de::Error>(self, v: u64) -> Result<FieldValue, E> {
        Ok(i64::try_from(v).map_or(FieldValue::Real(v as f64), FieldValue::Integer))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<FieldValue, E> {
        Ok(FieldValue::Real(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<FieldValue, E> {
        Ok(FieldValue::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<FieldValue, E> {
        Ok(FieldValue::Text(v))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<FieldValue, A::Error> {
        let Some(key) = map.next_key::<String>()? else {
            return Err(de::Error::custom("empty object is not a field value"));
        };
        if key != BLOB_TAG {
            return Err(de::Error::custom(format!(
                "unexpected object key '{key}' (only '{BLOB_TAG}' is allowed)"
            )));
        }
        let encoded: String = map.next_value()?;
        let bytes = BASE64
            .decode(encoded.as_bytes())
            .map_err(|e| de::Error::custom(format!("invalid base64 blob: {e}")))?;
        if map.next_key::<String>()?.is_some() {
            return Err(de::Error::custom("blob object must have exactly one key"));
        }
        Ok(FieldValue::Blob(bytes))
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(FieldValueVisitor)
    }
}

impl JsonSchema for FieldValue {
    fn schema_name() -> Cow<'static, str> {
        "FieldValue".into()
    }

    fn json_schema(_generator: &mut SchemaGenerator) -> Schema {
        json_schema!({
            "description": "A typed column value; blobs are tagged base64 objects.",
            "anyOf": [
                { "type": "null" },
                { "type": "boolean" },
                { "type": "number" },
                { "type": "string" },
                {
                    "type": "object",
                    "properties": { "$blob": { "type": "string" } },
                    "required": ["$blob"],
                    "additionalProperties": false
                }
            ]
        })
    }
}

/// Ordered mapping of field name to value.
///
/// Insertion order is preserved through serialization and deserialization.
/// Inserting an existing name replaces the value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    entries: Vec<(String, FieldValue)>,
}

impl FieldMap {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert or replace a value, keeping the original position on replace.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    #[must_use]
    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether both maps hold the same names and values, in any order.
    #[must_use]
    pub fn same_entries(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(name, value)| other.get(name).is_some_and(|v| v.same_value(value)))
    }

    /// First entry in declaration order.
    #[must_use]
    pub fn first(&self) -> Option<(&str, &FieldValue)> {
        self.entries.first().map(|(n, v)| (n.as_str(), v))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }
}

impl FromIterator<(String, FieldValue)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (name, value) in iter {
            map.insert(name, value);
        }
        map
    }
}

impl IntoIterator for FieldMap {
    type Item = (String, FieldValue);
    type IntoIter = std::vec::IntoIter<(String, FieldValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for FieldMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

struct FieldMapVisitor;

impl<'de> Visitor<'de> for FieldMapVisitor {
    type Value = FieldMap;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object of field name to value")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<FieldMap, A::Error> {
        let mut map = FieldMap::new();
        while let Some((name, value)) = access.next_entry::<String, FieldValue>()? {
            map.insert(name, value);
        }
        Ok(map)
    }
}

impl<'de> Deserialize<'de> for FieldMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(FieldMapVisitor)
    }
}

impl JsonSchema for FieldMap {
    fn schema_name() -> Cow<'static, str> {
        "FieldMap".into()
    }

    fn json_schema(generator: &mut SchemaGenerator) -> Schema {
        json_schema!({
            "type": "object",
            "additionalProperties": generator.subschema_for::<FieldValue>()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn null_equals_null() {
        assert_eq!(FieldValue::Null, FieldValue::Null);
        assert_ne!(FieldValue::Null, FieldValue::Text(String::new()));
    }

    #[test]
    fn nan_is_the_same_value_as_itself() {
        let nan = FieldValue::Real(f64::NAN);
        assert!(nan.same_value(&nan.clone()));
        assert!(FieldValue::Real(0.0).same_value(&FieldValue::Real(-0.0)));
        assert!(!FieldValue::Real(1.0).same_value(&FieldValue::Real(2.0)));
        assert!(!FieldValue::Integer(1).same_value(&FieldValue::Real(1.0)));
    }

    #[test]
    fn same_entries_ignores_order() {
        let a = FieldMap::new().with("order_id", 7_i64).with("line", 2_i64);
        let b = FieldMap::new().with("line", 2_i64).with("order_id", 7_i64);
        assert_ne!(a, b);
        assert!(a.same_entries(&b));
        assert!(!a.same_entries(&FieldMap::new().with("order_id", 7_i64)));
        assert!(!a.same_entries(&FieldMap::new().with("order_id", 7_i64).with("line", 3_i64)));
    }

    #[test]
    fn integer_and_real_are_distinct() {
        assert_ne!(FieldValue::Integer(1), FieldValue::Real(1.0));
    }

    #[test]
    fn option_conversion_maps_none_to_null() {
        let none: Option<&str> = None;
        assert_eq!(FieldValue::from(none), FieldValue::Null);
        assert_eq!(FieldValue::from(Some(5_i64)), FieldValue::Integer(5));
    }

    #[test]
    fn key_string_skips_null() {
        assert_eq!(FieldValue::Null.to_key_string(), None);
        assert_eq!(FieldValue::Integer(42).to_key_string().as_deref(), Some("42"));
        assert_eq!(
            FieldValue::from("emp-7").to_key_string().as_deref(),
            Some("emp-7")
        );
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut map = FieldMap::new().with("a", 1_i64).with("b", 2_i64);
        map.insert("a", 10_i64);
        let keys: Vec<&str> = map.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(map.get("a"), Some(&FieldValue::Integer(10)));
    }

    #[test]
    fn map_serializes_in_insertion_order() {
        let map = FieldMap::new()
            .with("zeta", "z")
            .with("alpha", FieldValue::Null)
            .with("mid", 3_i64);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"zeta":"z","alpha":null,"mid":3}"#);
    }

    #[test]
    fn blob_is_tagged() {
        let value = FieldValue::Blob(vec![1, 2, 3]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"$blob":"AQID"}"#);
        let back: FieldValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn non_finite_real_fails_to_serialize() {
        assert!(serde_json::to_string(&FieldValue::Real(f64::NAN)).is_err());
        assert!(!FieldValue::Real(f64::INFINITY).is_encodable());
    }

    #[test]
    fn untagged_object_is_rejected() {
        let parsed: Result<FieldValue, _> = serde_json::from_str(r#"{"other":1}"#);
        assert!(parsed.is_err());
    }
}
