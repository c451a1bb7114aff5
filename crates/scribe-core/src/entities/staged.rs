use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::enums::MutationKind;
use crate::value::{FieldMap, FieldValue};

/// Opaque handle to an entity tracked by a unit of work.
///
/// Used after commit to read back generated keys; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub struct EntityHandle(pub u64);

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Reference to the domain object behind a staged entity.
///
/// `entity_type` is the concrete type identifier. `base_type` is set for
/// derived or proxy types, and `table_annotation` carries a table name
/// declared on the type itself. Both are consulted only when the registry
/// has no mapping for `entity_type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRef {
    pub handle: EntityHandle,
    pub entity_type: String,
    pub base_type: Option<String>,
    pub table_annotation: Option<String>,
}

impl EntityRef {
    #[must_use]
    pub fn new(handle: EntityHandle, entity_type: impl Into<String>) -> Self {
        Self {
            handle,
            entity_type: entity_type.into(),
            base_type: None,
            table_annotation: None,
        }
    }

    #[must_use]
    pub fn with_base_type(mut self, base_type: impl Into<String>) -> Self {
        self.base_type = Some(base_type.into());
        self
    }

    #[must_use]
    pub fn with_table_annotation(mut self, table: impl Into<String>) -> Self {
        self.table_annotation = Some(table.into());
        self
    }
}

/// One tracked column: last-known persisted value and current value.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedField {
    pub name: String,
    pub original: FieldValue,
    pub current: FieldValue,
    pub is_primary_key: bool,
}

impl TrackedField {
    #[must_use]
    pub fn new(name: impl Into<String>, original: FieldValue, current: FieldValue) -> Self {
        Self {
            name: name.into(),
            original,
            current,
            is_primary_key: false,
        }
    }

    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    #[must_use]
    pub fn is_modified(&self) -> bool {
        !self.original.same_value(&self.current)
    }
}

/// An entity pending mutation, as reported by the unit of work.
///
/// Fields are in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedEntity {
    pub kind: MutationKind,
    pub entity: EntityRef,
    pub fields: Vec<TrackedField>,
}

impl StagedEntity {
    #[must_use]
    pub const fn new(kind: MutationKind, entity: EntityRef, fields: Vec<TrackedField>) -> Self {
        Self {
            kind,
            entity,
            fields,
        }
    }

    /// Current values of every field.
    #[must_use]
    pub fn current_values(&self) -> FieldMap {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), f.current.clone()))
            .collect()
    }

    /// Current values of the primary-key fields only.
    #[must_use]
    pub fn primary_key_values(&self) -> FieldMap {
        self.fields
            .iter()
            .filter(|f| f.is_primary_key)
            .map(|f| (f.name.clone(), f.current.clone()))
            .collect()
    }
}
