//! Schema and registry error types.

use thiserror::Error;

/// Errors from the entity and schema registries.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Requested schema name was not found in the registry.
    #[error("Schema not found: {0}")]
    NotFound(String),

    /// JSON value did not pass schema validation.
    #[error("Validation failed: {errors:?}")]
    ValidationFailed {
        /// Individual error messages from the validator.
        errors: Vec<String>,
    },

    /// Schema compilation error.
    #[error("Schema generation error: {0}")]
    Generation(String),

    /// An entity mapping is inconsistent (empty table, unknown key column,
    /// duplicate type).
    #[error("Invalid entity mapping for {entity_type}: {reason}")]
    InvalidMapping { entity_type: String, reason: String },
}
