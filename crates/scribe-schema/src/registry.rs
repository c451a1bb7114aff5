//! JSON Schemas for the audit types.
//!
//! The `SchemaRegistry` builds schemas from scribe-core types at construction
//! time using [`schemars::schema_for!`] and validates values via `jsonschema`.

use std::collections::HashMap;

use schemars::schema_for;

use crate::error::SchemaError;

/// Store of the audit JSON Schemas, keyed by snake_case type name.
pub struct SchemaRegistry {
    schemas: HashMap<&'static str, serde_json::Value>,
}

macro_rules! register {
    ($map:expr, $name:expr, $ty:ty) => {
        $map.insert($name, schema_for!($ty).to_value());
    };
}

impl SchemaRegistry {
    /// Build a registry containing the audit row, event entry, change and
    /// field-map schemas.
    #[must_use]
    pub fn new() -> Self {
        let mut schemas = HashMap::new();

        register!(
            schemas,
            "transaction_log",
            scribe_core::entities::TransactionLog
        );
        register!(schemas, "event_entry", scribe_core::entities::EventEntry);
        register!(
            schemas,
            "event_entry_change",
            scribe_core::entities::EventEntryChange
        );
        register!(schemas, "field_map", scribe_core::FieldMap);
        register!(schemas, "audit_action", scribe_core::enums::AuditAction);

        Self { schemas }
    }

    /// Get a schema by name. Returns `None` if not found.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.schemas.get(name)
    }

    /// Validate a JSON value against a named schema.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::NotFound` if the schema name is unknown, or
    /// `SchemaError::ValidationFailed` if validation produces errors.
    pub fn validate(&self, name: &str, instance: &serde_json::Value) -> Result<(), SchemaError> {
        let schema = self
            .get(name)
            .ok_or_else(|| SchemaError::NotFound(name.to_string()))?;

        let validator = jsonschema::validator_for(schema)
            .map_err(|e| SchemaError::Generation(format!("{e}")))?;

        let errors: Vec<String> = validator
            .iter_errors(instance)
            .map(|e| format!("{e}"))
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::ValidationFailed { errors })
        }
    }

    /// Validate the text stored in `old_values` / `new_values`.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::ValidationFailed` if the text is not JSON or is
    /// not a field map.
    pub fn validate_field_map_text(&self, text: &str) -> Result<(), SchemaError> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| SchemaError::ValidationFailed {
                errors: vec![format!("not JSON: {e}")],
            })?;
        self.validate("field_map", &value)
    }

    /// List all registered schema names.
    #[must_use]
    pub fn list(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.schemas.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Number of registered schemas.
    #[must_use]
    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}
