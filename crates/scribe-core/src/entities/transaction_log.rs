use chrono::{DateTime, SecondsFormat, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::event_entry::EventEntry;
use crate::enums::AuditAction;
use crate::serializer::serialize_field_map;
use crate::value::{FieldMap, FieldValue};

/// Entity type identifier of audit rows. Never captured for auditing.
pub const TRANSACTION_LOG_TYPE: &str = "TransactionLog";

/// Table that holds audit rows.
pub const TRANSACTION_LOG_TABLE: &str = "transaction_log";

/// A durable, append-only audit row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TransactionLog {
    /// Surrogate row id, assigned by the store.
    pub id: Option<i64>,
    pub action: AuditAction,
    pub action_datetime: DateTime<Utc>,
    pub table_name: String,
    pub table_pk: Option<String>,
    /// Serialized original values; present for updates and deletes.
    pub old_values: Option<String>,
    /// Serialized new values; present for inserts and updates.
    pub new_values: Option<String>,
    pub user_name: String,
}

/// A freshly built audit row plus the fields that had to be replaced by a
/// placeholder during serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltLog {
    pub log: TransactionLog,
    pub degraded: Vec<String>,
}

impl TransactionLog {
    /// Build the audit row for one (key-backfilled) event entry.
    #[must_use]
    pub fn from_event_entry(
        entry: &EventEntry,
        action_datetime: DateTime<Utc>,
        user_name: impl Into<String>,
    ) -> BuiltLog {
        let mut degraded = Vec::new();
        let mut encode = |map: FieldMap| {
            let serialized = serialize_field_map(&map);
            degraded.extend(serialized.degraded);
            serialized.text
        };

        let old_values = entry
            .action
            .records_old_values()
            .then(|| encode(entry.old_values()));
        let new_values = entry
            .action
            .records_new_values()
            .then(|| encode(entry.new_values()));

        BuiltLog {
            log: Self {
                id: None,
                action: entry.action,
                action_datetime,
                table_name: entry.table.clone(),
                table_pk: entry.primary_key_text(),
                old_values,
                new_values,
                user_name: user_name.into(),
            },
            degraded,
        }
    }

    /// Column values as written to the `transaction_log` table, excluding
    /// the surrogate id.
    #[must_use]
    pub fn to_field_map(&self) -> FieldMap {
        FieldMap::new()
            .with("action", self.action.as_str())
            .with(
                "action_datetime",
                self.action_datetime
                    .to_rfc3339_opts(SecondsFormat::Micros, true),
            )
            .with("table_name", self.table_name.as_str())
            .with("table_pk", FieldValue::from(self.table_pk.clone()))
            .with("old_values", FieldValue::from(self.old_values.clone()))
            .with("new_values", FieldValue::from(self.new_values.clone()))
            .with("user_name", self.user_name.as_str())
    }
}
