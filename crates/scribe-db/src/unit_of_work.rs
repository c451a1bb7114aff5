//! libSQL-backed unit of work.
//!
//! Tracks inserts, loaded rows, field edits and deletes in memory, keeping
//! each field's last persisted value next to its current value. `commit`
//! writes every pending change inside one libSQL transaction and rolls the
//! whole batch back on the first failure. Auto-increment keys are read with
//! `last_insert_rowid` and applied to the tracked entities only once the
//! transaction has committed.
//!
//! State transitions:
//!
//! ```text
//! insert → Insert ──commit──→ Unchanged
//! load   → Unchanged ──set_field / mark_modified──→ Update ──commit──→ Unchanged
//! delete: Insert → Detached, Unchanged | Update → Delete ──commit──→ Detached
//! ```
//!
//! A commit stops tracking detached entities and committed audit rows.

use std::sync::Arc;

use scribe_core::entities::{
    EntityHandle, EntityRef, StagedEntity, TRANSACTION_LOG_TYPE, TrackedField, TransactionLog,
};
use scribe_core::enums::MutationKind;
use scribe_core::serializer::serialize_field_map;
use scribe_core::{FieldMap, FieldValue};
use scribe_schema::{EntityMapping, EntityRegistry};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::helpers::{from_sql_value, quote_ident, to_sql_value};
use crate::store::TransactionalStore;

#[derive(Debug, Clone)]
struct Tracked {
    entity: EntityRef,
    table: String,
    primary_key: Vec<String>,
    columns: Vec<String>,
    generated_key: Option<String>,
    state: MutationKind,
    fields: Vec<TrackedField>,
}

impl Tracked {
    fn field(&self, name: &str) -> Option<&TrackedField> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn original_key(&self) -> FieldMap {
        self.fields
            .iter()
            .filter(|f| f.is_primary_key)
            .map(|f| (f.name.clone(), f.original.clone()))
            .collect()
    }

    fn current_values(&self) -> FieldMap {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), f.current.clone()))
            .collect()
    }

    fn invalid_state(&self, reason: &str) -> StoreError {
        StoreError::InvalidState {
            handle: self.entity.handle,
            state: self.state.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Pending mutations against one libSQL connection.
pub struct UnitOfWork {
    conn: libsql::Connection,
    registry: Arc<EntityRegistry>,
    entries: Vec<Tracked>,
    next_handle: u64,
}

impl UnitOfWork {
    #[must_use]
    pub const fn new(conn: libsql::Connection, registry: Arc<EntityRegistry>) -> Self {
        Self {
            conn,
            registry,
            entries: Vec::new(),
            next_handle: 1,
        }
    }

    /// Track a new entity for insertion.
    ///
    /// A generated key column left out of `values` is tracked as a null
    /// placeholder after the supplied columns and filled in on commit.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unmapped` for an unregistered type, or
    /// `StoreError::UnknownColumn` for a column outside the mapping.
    pub fn insert(&mut self, entity_type: &str, values: FieldMap) -> Result<EntityHandle, StoreError> {
        let entity = EntityRef::new(self.allocate_handle(), entity_type);
        self.track_insert(entity, values)
    }

    /// Track a new entity of a derived type, mapped through its base type.
    ///
    /// # Errors
    ///
    /// Same as [`Self::insert`].
    pub fn insert_derived(
        &mut self,
        entity_type: &str,
        base_type: &str,
        values: FieldMap,
    ) -> Result<EntityHandle, StoreError> {
        let entity = EntityRef::new(self.allocate_handle(), entity_type).with_base_type(base_type);
        self.track_insert(entity, values)
    }

    /// Load a row by primary key and start tracking it as unchanged.
    ///
    /// Returns the existing handle if the row is already tracked, and `None`
    /// if no row matches.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the type is unmapped, the key does not name
    /// the mapping's key columns, or the query fails.
    pub async fn load(
        &mut self,
        entity_type: &str,
        key: &FieldMap,
    ) -> Result<Option<EntityHandle>, StoreError> {
        let mapping = self
            .registry
            .mapping(entity_type)
            .cloned()
            .ok_or_else(|| StoreError::Unmapped(entity_type.to_string()))?;
        if mapping.columns.is_empty() {
            return Err(StoreError::Unmapped(entity_type.to_string()));
        }
        if let Some(column) = key.keys().find(|k| !mapping.is_primary_key(k)) {
            return Err(StoreError::UnknownColumn {
                table: mapping.table.clone(),
                column: column.to_string(),
            });
        }
        if key.len() != mapping.primary_key.len() {
            return Err(StoreError::InvalidKey {
                table: mapping.table.clone(),
                reason: format!("key must name every column of {:?}", mapping.primary_key),
            });
        }

        if let Some(existing) = self.entries.iter().find(|e| {
            e.entity.entity_type == entity_type
                && e.state != MutationKind::Detached
                && e.original_key().same_entries(key)
        }) {
            return Ok(Some(existing.entity.handle));
        }

        let select = mapping
            .columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let (where_clause, params) = key_predicate(key, 1);
        let sql = format!(
            "SELECT {select} FROM {} WHERE {where_clause} LIMIT 1",
            quote_ident(&mapping.table)
        );

        let mut rows = self
            .conn
            .query(&sql, libsql::params_from_iter(params))
            .await?;
        let Some(row) = rows.next().await? else {
            return Ok(None);
        };

        let mut fields = Vec::with_capacity(mapping.columns.len());
        for (idx, column) in (0_i32..).zip(mapping.columns.iter()) {
            let value = from_sql_value(row.get_value(idx)?);
            let mut field = TrackedField::new(column.as_str(), value.clone(), value);
            field.is_primary_key = mapping.is_primary_key(column);
            fields.push(field);
        }

        let entity = EntityRef::new(self.allocate_handle(), entity_type);
        let handle = entity.handle;
        self.entries.push(Tracked {
            table: self.registry.resolve(&entity).table,
            primary_key: mapping.primary_key.clone(),
            columns: mapping.columns.clone(),
            generated_key: generated_column(&mapping),
            entity,
            state: MutationKind::Unchanged,
            fields,
        });
        Ok(Some(handle))
    }

    /// Set a column's current value.
    ///
    /// Marks an unchanged entity as updated even if the value is the same;
    /// the audit pipeline decides whether anything really changed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` for an unknown handle or column, or if the
    /// entity is deleted or detached.
    pub fn set_field(
        &mut self,
        handle: EntityHandle,
        column: &str,
        value: impl Into<FieldValue>,
    ) -> Result<(), StoreError> {
        let entry = self.entry_mut(handle)?;
        match entry.state {
            MutationKind::Delete | MutationKind::Detached => {
                return Err(entry.invalid_state("cannot edit a deleted entity"));
            }
            MutationKind::Unchanged => entry.state = MutationKind::Update,
            MutationKind::Insert | MutationKind::Update => {}
        }
        let value = value.into();
        if let Some(field) = entry.fields.iter_mut().find(|f| f.name == column) {
            field.current = value;
            return Ok(());
        }
        if !entry.columns.iter().any(|c| c == column) {
            return Err(StoreError::UnknownColumn {
                table: entry.table.clone(),
                column: column.to_string(),
            });
        }
        let mut field = TrackedField::new(column, FieldValue::Null, value);
        field.is_primary_key = entry.primary_key.iter().any(|k| k == column);
        entry.fields.push(field);
        Ok(())
    }

    /// Apply several column values at once, in map order.
    ///
    /// # Errors
    ///
    /// Same as [`Self::set_field`].
    pub fn set_fields(&mut self, handle: EntityHandle, values: &FieldMap) -> Result<(), StoreError> {
        for (column, value) in values.iter() {
            self.set_field(handle, column, value.clone())?;
        }
        Ok(())
    }

    /// Mark an unchanged entity as updated without editing any field.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` for an unknown handle, or if the entity is
    /// deleted or detached.
    pub fn mark_modified(&mut self, handle: EntityHandle) -> Result<(), StoreError> {
        let entry = self.entry_mut(handle)?;
        match entry.state {
            MutationKind::Unchanged => {
                entry.state = MutationKind::Update;
                Ok(())
            }
            MutationKind::Insert | MutationKind::Update => Ok(()),
            MutationKind::Delete | MutationKind::Detached => {
                Err(entry.invalid_state("cannot modify a deleted entity"))
            }
        }
    }

    /// Mark an entity for deletion. A pending insert is simply dropped.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` for an unknown handle, or if the entity is
    /// already deleted or detached.
    pub fn delete(&mut self, handle: EntityHandle) -> Result<(), StoreError> {
        let entry = self.entry_mut(handle)?;
        entry.state = match entry.state {
            MutationKind::Insert => MutationKind::Detached,
            MutationKind::Unchanged | MutationKind::Update => MutationKind::Delete,
            MutationKind::Delete | MutationKind::Detached => {
                return Err(entry.invalid_state("already deleted"));
            }
        };
        Ok(())
    }

    /// Current column values of a tracked entity.
    #[must_use]
    pub fn values(&self, handle: EntityHandle) -> Option<FieldMap> {
        self.entry(handle).map(Tracked::current_values)
    }

    /// Tracked state of an entity.
    #[must_use]
    pub fn state(&self, handle: EntityHandle) -> Option<MutationKind> {
        self.entry(handle).map(|e| e.state)
    }

    /// Whether anything is waiting to be committed.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.entries.iter().any(|e| e.state.is_auditable())
    }

    /// Number of tracked entities, including unchanged and detached ones.
    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.entries.len()
    }

    fn allocate_handle(&mut self) -> EntityHandle {
        let handle = EntityHandle(self.next_handle);
        self.next_handle += 1;
        handle
    }

    fn entry(&self, handle: EntityHandle) -> Option<&Tracked> {
        self.entries.iter().find(|e| e.entity.handle == handle)
    }

    fn entry_mut(&mut self, handle: EntityHandle) -> Result<&mut Tracked, StoreError> {
        self.entries
            .iter_mut()
            .find(|e| e.entity.handle == handle)
            .ok_or(StoreError::UnknownEntity(handle))
    }

    fn track_insert(&mut self, entity: EntityRef, values: FieldMap) -> Result<EntityHandle, StoreError> {
        let mapping = self
            .registry
            .mapping_for(&entity)
            .cloned()
            .ok_or_else(|| StoreError::Unmapped(entity.entity_type.clone()))?;
        let table = self.registry.resolve(&entity).table;

        let mut fields = Vec::with_capacity(values.len() + 1);
        for (column, value) in values {
            if !mapping.columns.is_empty() && !mapping.columns.contains(&column) {
                return Err(StoreError::UnknownColumn { table, column });
            }
            let mut field = TrackedField::new(column, FieldValue::Null, value);
            field.is_primary_key = mapping.is_primary_key(&field.name);
            fields.push(field);
        }

        let generated_key = generated_column(&mapping);
        if let Some(ref key) = generated_key {
            if !fields.iter().any(|f| f.name == *key) {
                fields.push(TrackedField::new(key.as_str(), FieldValue::Null, FieldValue::Null).primary_key());
            }
        }

        let handle = entity.handle;
        self.entries.push(Tracked {
            entity,
            table,
            primary_key: mapping.primary_key.clone(),
            columns: mapping.columns.clone(),
            generated_key,
            state: MutationKind::Insert,
            fields,
        });
        Ok(handle)
    }

    /// Write one pending entry. Returns the generated key for inserts that
    /// left it to the store.
    async fn write_entry(
        conn: &libsql::Connection,
        entry: &Tracked,
    ) -> Result<Option<i64>, StoreError> {
        let table = quote_ident(&entry.table);
        match entry.state {
            MutationKind::Insert => {
                let generated = entry
                    .generated_key
                    .as_deref()
                    .filter(|key| entry.field(key).is_none_or(|f| f.current.is_null()));
                let written: Vec<&TrackedField> = entry
                    .fields
                    .iter()
                    .filter(|f| Some(f.name.as_str()) != generated)
                    .collect();

                if written.is_empty() {
                    conn.execute(&format!("INSERT INTO {table} DEFAULT VALUES"), ())
                        .await?;
                } else {
                    let columns = written
                        .iter()
                        .map(|f| quote_ident(&f.name))
                        .collect::<Vec<_>>()
                        .join(", ");
                    let placeholders = (1..=written.len())
                        .map(|i| format!("?{i}"))
                        .collect::<Vec<_>>()
                        .join(", ");
                    let params: Vec<libsql::Value> =
                        written.iter().map(|f| to_sql_value(&f.current)).collect();
                    conn.execute(
                        &format!("INSERT INTO {table} ({columns}) VALUES ({placeholders})"),
                        libsql::params_from_iter(params),
                    )
                    .await?;
                }
                Ok(generated.map(|_| conn.last_insert_rowid()))
            }
            MutationKind::Update => {
                let changed: Vec<&TrackedField> =
                    entry.fields.iter().filter(|f| f.is_modified()).collect();
                if changed.is_empty() {
                    return Ok(None);
                }
                let key = require_key(entry)?;
                let assignments = changed
                    .iter()
                    .enumerate()
                    .map(|(i, f)| format!("{} = ?{}", quote_ident(&f.name), i + 1))
                    .collect::<Vec<_>>()
                    .join(", ");
                let mut params: Vec<libsql::Value> =
                    changed.iter().map(|f| to_sql_value(&f.current)).collect();
                let (where_clause, key_params) = key_predicate(&key, params.len() + 1);
                params.extend(key_params);

                let affected = conn
                    .execute(
                        &format!("UPDATE {table} SET {assignments} WHERE {where_clause}"),
                        libsql::params_from_iter(params),
                    )
                    .await?;
                ensure_matched(affected, entry, &key)?;
                Ok(None)
            }
            MutationKind::Delete => {
                let key = require_key(entry)?;
                let (where_clause, params) = key_predicate(&key, 1);
                let affected = conn
                    .execute(
                        &format!("DELETE FROM {table} WHERE {where_clause}"),
                        libsql::params_from_iter(params),
                    )
                    .await?;
                ensure_matched(affected, entry, &key)?;
                Ok(None)
            }
            MutationKind::Unchanged | MutationKind::Detached => Ok(None),
        }
    }

    /// Fold committed changes into the tracked state.
    fn accept_changes(&mut self, pending: &[usize], generated: &[(usize, i64)]) {
        for &(idx, rowid) in generated {
            let entry = &mut self.entries[idx];
            if let Some(key) = entry.generated_key.clone() {
                if let Some(field) = entry.fields.iter_mut().find(|f| f.name == key) {
                    field.current = FieldValue::Integer(rowid);
                }
            }
        }
        for &idx in pending {
            let entry = &mut self.entries[idx];
            entry.state = match entry.state {
                MutationKind::Delete => MutationKind::Detached,
                _ => MutationKind::Unchanged,
            };
            for field in &mut entry.fields {
                field.original = field.current.clone();
            }
        }
        self.prune();
    }

    /// Forget detached entities and audit rows that are already written.
    fn prune(&mut self) {
        self.entries.retain(|e| {
            e.state != MutationKind::Detached
                && !(e.state == MutationKind::Unchanged && e.entity.entity_type == TRANSACTION_LOG_TYPE)
        });
    }
}

impl TransactionalStore for UnitOfWork {
    async fn enumerate_tracked_entities(&mut self) -> Result<Vec<StagedEntity>, StoreError> {
        Ok(self
            .entries
            .iter()
            .map(|e| StagedEntity::new(e.state, e.entity.clone(), e.fields.clone()))
            .collect())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        let pending: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.state.is_auditable())
            .map(|(i, _)| i)
            .collect();
        if pending.is_empty() {
            self.prune();
            return Ok(());
        }

        let tx = self.conn.transaction().await?;
        let mut generated = Vec::new();
        for &idx in &pending {
            match Self::write_entry(&tx, &self.entries[idx]).await {
                Ok(Some(rowid)) => generated.push((idx, rowid)),
                Ok(None) => {}
                Err(e) => {
                    if let Err(rollback) = tx.rollback().await {
                        warn!(error = %rollback, "unit of work: rollback failed");
                    }
                    debug!(error = %e, "unit of work: commit rolled back");
                    return Err(e);
                }
            }
        }
        tx.commit().await?;

        self.accept_changes(&pending, &generated);
        debug!(
            written = pending.len(),
            generated = generated.len(),
            "unit of work: committed"
        );
        Ok(())
    }

    async fn resolve_primary_key(&mut self, entity: EntityHandle) -> Result<FieldMap, StoreError> {
        let entry = self.entry(entity).ok_or(StoreError::UnknownEntity(entity))?;
        let key: FieldMap = entry
            .fields
            .iter()
            .filter(|f| f.is_primary_key)
            .map(|f| (f.name.clone(), f.current.clone()))
            .collect();
        if key.is_empty() || key.iter().any(|(_, v)| v.is_null()) {
            return Err(StoreError::UnresolvedKey(entity));
        }
        Ok(key)
    }

    fn add_rows(&mut self, table: &str, rows: Vec<TransactionLog>) -> Result<(), StoreError> {
        let entity_type = self
            .registry
            .mapping_for_table(table)
            .map(|m| m.entity_type.clone())
            .ok_or_else(|| StoreError::Unmapped(table.to_string()))?;
        for row in rows {
            let mut values = row.to_field_map();
            if let Some(id) = row.id {
                values.insert("id", id);
            }
            self.insert(&entity_type, values)?;
        }
        Ok(())
    }
}

fn generated_column(mapping: &EntityMapping) -> Option<String> {
    if mapping.generated_key {
        mapping.primary_key.first().cloned()
    } else {
        None
    }
}

fn require_key(entry: &Tracked) -> Result<FieldMap, StoreError> {
    let key = entry.original_key();
    if key.is_empty() || key.len() != entry.primary_key.len() {
        return Err(entry.invalid_state("entity has no primary key"));
    }
    Ok(key)
}

fn ensure_matched(affected: u64, entry: &Tracked, key: &FieldMap) -> Result<(), StoreError> {
    if affected == 0 {
        return Err(StoreError::Conflict {
            table: entry.table.clone(),
            key: serialize_field_map(key).text,
        });
    }
    Ok(())
}

/// `"a" = ?n AND "b" = ?n+1` plus the bound values, numbered from `first`.
fn key_predicate(key: &FieldMap, first: usize) -> (String, Vec<libsql::Value>) {
    let clause = key
        .keys()
        .enumerate()
        .map(|(i, column)| format!("{} = ?{}", quote_ident(column), first + i))
        .collect::<Vec<_>>()
        .join(" AND ");
    let params = key.iter().map(|(_, v)| to_sql_value(v)).collect();
    (clause, params)
}
