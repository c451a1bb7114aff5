//! Mutation kinds and audit actions.
//!
//! `MutationKind` is the tracked state of an entity inside a unit of work.
//! Only `Insert`, `Update` and `Delete` are audit-relevant; those three map
//! onto `AuditAction`, the value stored in `transaction_log.action`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::CoreError;

// ---------------------------------------------------------------------------
// MutationKind
// ---------------------------------------------------------------------------

/// Tracked state of an entity within a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Insert,
    Update,
    Delete,
    Unchanged,
    Detached,
}

impl MutationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Unchanged => "unchanged",
            Self::Detached => "detached",
        }
    }

    /// Whether entities in this state produce audit records.
    #[must_use]
    pub const fn is_auditable(self) -> bool {
        matches!(self, Self::Insert | Self::Update | Self::Delete)
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AuditAction
// ---------------------------------------------------------------------------

/// Action recorded on an audit row.
///
/// Stored capitalized (`"Insert"`, `"Update"`, `"Delete"`) to match the
/// `transaction_log.action` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum AuditAction {
    Insert,
    Update,
    Delete,
}

impl AuditAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "Insert",
            Self::Update => "Update",
            Self::Delete => "Delete",
        }
    }

    /// `old_values` is written for updates and deletes.
    #[must_use]
    pub const fn records_old_values(self) -> bool {
        matches!(self, Self::Update | Self::Delete)
    }

    /// `new_values` is written for inserts and updates.
    #[must_use]
    pub const fn records_new_values(self) -> bool {
        matches!(self, Self::Insert | Self::Update)
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "insert" => Ok(Self::Insert),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(CoreError::InvalidValue(format!(
                "unknown audit action '{other}'"
            ))),
        }
    }
}

impl TryFrom<MutationKind> for AuditAction {
    type Error = MutationKind;

    fn try_from(kind: MutationKind) -> Result<Self, Self::Error> {
        match kind {
            MutationKind::Insert => Ok(Self::Insert),
            MutationKind::Update => Ok(Self::Update),
            MutationKind::Delete => Ok(Self::Delete),
            MutationKind::Unchanged | MutationKind::Detached => Err(kind),
        }
    }
}
