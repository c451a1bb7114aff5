use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::staged::EntityHandle;
use crate::enums::AuditAction;
use crate::serializer::serialize_field_map;
use crate::value::{FieldMap, FieldValue};

/// One field-level change. Absent values are `FieldValue::Null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EventEntryChange {
    pub column_name: String,
    pub original_value: FieldValue,
    pub new_value: FieldValue,
}

impl EventEntryChange {
    #[must_use]
    pub fn new(column_name: impl Into<String>, original_value: FieldValue, new_value: FieldValue) -> Self {
        Self {
            column_name: column_name.into(),
            original_value,
            new_value,
        }
    }
}

/// In-memory audit record for one staged entity.
///
/// Built during capture, key-backfilled once after the original commit,
/// then consumed to produce a `TransactionLog`. An `Update` entry always
/// carries at least one change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EventEntry {
    pub schema: Option<String>,
    pub table: String,
    pub action: AuditAction,
    pub primary_key: FieldMap,
    pub changes: Vec<EventEntryChange>,
    pub column_values: FieldMap,
    /// Originating entity, kept only to resolve generated keys.
    #[serde(skip)]
    pub entity: Option<EntityHandle>,
}

impl EventEntry {
    /// Original values of the change list, in change order.
    #[must_use]
    pub fn old_values(&self) -> FieldMap {
        self.changes
            .iter()
            .map(|c| (c.column_name.clone(), c.original_value.clone()))
            .collect()
    }

    /// New values of the change list, in change order.
    #[must_use]
    pub fn new_values(&self) -> FieldMap {
        self.changes
            .iter()
            .map(|c| (c.column_name.clone(), c.new_value.clone()))
            .collect()
    }

    /// Replace key values with those resolved after commit.
    ///
    /// The key columns' new values in the change list and the column
    /// snapshot are updated too, so `new_values` carries the real key
    /// instead of the pre-commit placeholder.
    pub fn backfill_primary_key(&mut self, resolved: &FieldMap) {
        for (name, value) in resolved.iter() {
            self.primary_key.insert(name, value.clone());
            self.column_values.insert(name, value.clone());
            if self.action.records_new_values() {
                for change in self.changes.iter_mut().filter(|c| c.column_name == name) {
                    change.new_value = value.clone();
                }
            }
        }
    }

    /// Text stored in `transaction_log.table_pk`.
    ///
    /// A single-column key is its stringified value. A multi-column key is
    /// the serialized object of every component, in key order. `None` when
    /// there is no key or the only component is still null.
    #[must_use]
    pub fn primary_key_text(&self) -> Option<String> {
        match self.primary_key.len() {
            0 => None,
            1 => self.primary_key.first().and_then(|(_, v)| v.to_key_string()),
            _ => Some(serialize_field_map(&self.primary_key).text),
        }
    }
}
