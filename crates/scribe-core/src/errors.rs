//! Cross-cutting error types for Scribe.
//!
//! Errors that can originate from any crate in the system. Storage errors
//! (`DatabaseError`, `StoreError`) and the save outcome (`SaveError`) live in
//! `scribe-db`; the CLI converges everything into `anyhow`.

use thiserror::Error;

/// Errors that can be raised by any Scribe crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Entity lookup returned no result.
    #[error("Entity not found: {entity_type} {id}")]
    NotFound { entity_type: String, id: String },

    /// A stored value could not be parsed back into its typed form.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Serialized field-map text could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
