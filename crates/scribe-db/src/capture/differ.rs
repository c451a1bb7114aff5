//! Differ: field-level changes for one staged entity.
//!
//! One function per action. Fields keep declaration order so identical
//! input always yields identical audit text.

use scribe_core::FieldValue;
use scribe_core::entities::{EventEntryChange, StagedEntity};
use scribe_core::enums::AuditAction;

/// Changes for a staged entity, or `None` when it must not be audited:
/// either its kind is not auditable or it is an update with no field that
/// actually differs.
#[must_use]
pub fn diff(staged: &StagedEntity) -> Option<Vec<EventEntryChange>> {
    match AuditAction::try_from(staged.kind).ok()? {
        AuditAction::Insert => Some(diff_insert(staged)),
        AuditAction::Update => diff_update(staged),
        AuditAction::Delete => Some(diff_delete(staged)),
    }
}

/// Every field, from null to its current value.
#[must_use]
pub fn diff_insert(staged: &StagedEntity) -> Vec<EventEntryChange> {
    staged
        .fields
        .iter()
        .map(|f| EventEntryChange::new(f.name.as_str(), FieldValue::Null, f.current.clone()))
        .collect()
}

/// Every field, from its last persisted value to null.
#[must_use]
pub fn diff_delete(staged: &StagedEntity) -> Vec<EventEntryChange> {
    staged
        .fields
        .iter()
        .map(|f| EventEntryChange::new(f.name.as_str(), f.original.clone(), FieldValue::Null))
        .collect()
}

/// Only fields whose value differs. `None` when nothing does.
#[must_use]
pub fn diff_update(staged: &StagedEntity) -> Option<Vec<EventEntryChange>> {
    let changes: Vec<EventEntryChange> = staged
        .fields
        .iter()
        .filter(|f| f.is_modified())
        .map(|f| EventEntryChange::new(f.name.as_str(), f.original.clone(), f.current.clone()))
        .collect();
    (!changes.is_empty()).then_some(changes)
}
