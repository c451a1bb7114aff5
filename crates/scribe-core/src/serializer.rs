//! Deterministic field-map encoding for `old_values` / `new_values`.
//!
//! Output is a compact JSON object whose keys appear in the map's order.
//! Identical input always yields identical text. A value that cannot be
//! encoded is written as [`UNSERIALIZABLE_MARKER`] and its field name is
//! reported back, so one bad value never costs the whole audit row.

use serde_json::Value;

use crate::errors::CoreError;
use crate::value::FieldMap;

/// Placeholder written in place of a value that has no text encoding.
pub const UNSERIALIZABLE_MARKER: &str = "<unserializable>";

/// Encoded field map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Serialized {
    pub text: String,
    /// Fields whose value was replaced by the placeholder.
    pub degraded: Vec<String>,
}

impl Serialized {
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}

/// Encode a field map, preserving key order.
#[must_use]
pub fn serialize_field_map(map: &FieldMap) -> Serialized {
    let mut text = String::from("{");
    let mut degraded = Vec::new();

    for (i, (name, value)) in map.iter().enumerate() {
        if i > 0 {
            text.push(',');
        }
        text.push_str(&Value::String(name.to_string()).to_string());
        text.push(':');
        match serde_json::to_value(value) {
            Ok(encoded) => text.push_str(&encoded.to_string()),
            Err(e) => {
                tracing::warn!(
                    field = name,
                    kind = value.kind_name(),
                    error = %e,
                    "serializer: value replaced by placeholder"
                );
                text.push_str(&Value::String(UNSERIALIZABLE_MARKER.to_string()).to_string());
                degraded.push(name.to_string());
            }
        }
    }

    text.push('}');
    Serialized { text, degraded }
}

/// Decode text produced by [`serialize_field_map`].
///
/// # Errors
///
/// Returns `CoreError::Serialization` if the text is not a JSON object of
/// field values.
pub fn deserialize_field_map(text: &str) -> Result<FieldMap, CoreError> {
    Ok(serde_json::from_str(text)?)
}
