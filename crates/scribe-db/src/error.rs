//! Error types for scribe-db.
//!
//! `DatabaseError` covers raw libSQL access. `StoreError` is what a
//! transactional store reports to the save pipeline, and `SaveError` is the
//! outcome of `save_with_audit`, split on whether the data change was
//! already committed when the failure happened.

use scribe_core::entities::EntityHandle;
use scribe_core::errors::CoreError;
use thiserror::Error;

/// Errors from database operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// A SQL query failed.
    #[error("Query failed: {0}")]
    Query(String),

    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Expected a result row but none was returned.
    #[error("No result returned")]
    NoResult,

    /// Invalid state encountered (e.g., bad data in DB).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors raised by a transactional store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// The handle does not belong to this unit of work.
    #[error("Unknown entity {0}")]
    UnknownEntity(EntityHandle),

    /// No registry mapping for the entity type.
    #[error("Entity type '{0}' is not mapped to a table")]
    Unmapped(String),

    /// Column is not part of the entity's mapping.
    #[error("Unknown column '{column}' on table '{table}'")]
    UnknownColumn { table: String, column: String },

    /// Operation not allowed in the entity's current state.
    #[error("Entity {handle} is {state}: {reason}")]
    InvalidState {
        handle: EntityHandle,
        state: String,
        reason: String,
    },

    /// A lookup key does not match the mapping's key columns.
    #[error("Invalid key for '{table}': {reason}")]
    InvalidKey { table: String, reason: String },

    /// An update or delete matched no row.
    #[error("No row in '{table}' matched key {key}")]
    Conflict { table: String, key: String },

    /// Key columns are still unset after commit.
    #[error("Primary key of entity {0} is not resolved")]
    UnresolvedKey(EntityHandle),

    /// Failure reported by a store that is not backed by libSQL.
    #[error("Store error: {0}")]
    Other(String),
}

impl From<libsql::Error> for StoreError {
    fn from(err: libsql::Error) -> Self {
        Self::Database(DatabaseError::LibSql(err))
    }
}

/// Failure of an audited save.
#[derive(Debug, Error)]
pub enum SaveError {
    /// Pending changes could not be enumerated. Nothing was committed.
    #[error("Change capture failed: {source}")]
    Capture { source: StoreError },

    /// Cancelled before the original commit. Nothing was committed.
    #[error("Save cancelled before commit")]
    Cancelled,

    /// The original changes failed to commit and were rolled back.
    #[error("Commit failed: {source}")]
    StoreCommit { source: StoreError },

    /// The data change is committed but its audit rows are not.
    #[error("Changes committed but {unaudited} audit row(s) were not written: {source}")]
    AuditCommit { unaudited: usize, source: StoreError },
}

impl SaveError {
    /// Whether the original data change is durable despite this error.
    #[must_use]
    pub const fn data_committed(&self) -> bool {
        matches!(self, Self::AuditCommit { .. })
    }

    /// Whether retrying the same save may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreCommit { .. } | Self::Cancelled)
    }

    pub(crate) fn into_store_error(self) -> StoreError {
        match self {
            Self::Capture { source }
            | Self::StoreCommit { source }
            | Self::AuditCommit { source, .. } => source,
            Self::Cancelled => StoreError::Other("cancelled".into()),
        }
    }
}

/// Errors from the service-level employee operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// Staging the change in the unit of work failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Save(#[from] SaveError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_audit_failure_reports_committed_data() {
        let audit = SaveError::AuditCommit {
            unaudited: 2,
            source: StoreError::Other("disk full".into()),
        };
        assert!(audit.data_committed());
        assert!(!audit.is_retryable());

        let commit = SaveError::StoreCommit {
            source: StoreError::Other("locked".into()),
        };
        assert!(!commit.data_committed());
        assert!(commit.is_retryable());
        assert!(!SaveError::Cancelled.data_committed());
    }

    #[test]
    fn audit_error_message_names_row_count() {
        let err = SaveError::AuditCommit {
            unaudited: 3,
            source: StoreError::Other("boom".into()),
        };
        assert_eq!(
            err.to_string(),
            "Changes committed but 3 audit row(s) were not written: Store error: boom"
        );
    }
}
