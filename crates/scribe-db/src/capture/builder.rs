//! AuditRecordBuilder: staged entity + diff → event entry.

use scribe_core::FieldMap;
use scribe_core::entities::{EventEntry, EventEntryChange};
use scribe_core::enums::AuditAction;

use super::reader::CapturedEntity;

/// Build the event entry for a captured entity.
///
/// The key mapping holds the fields flagged as primary key. For inserts
/// with a store-generated key it is still a placeholder here and gets
/// backfilled after commit. Deletes take their key from the last persisted
/// values. Returns `None` for kinds that are not auditable.
#[must_use]
pub fn build_event_entry(captured: &CapturedEntity, changes: Vec<EventEntryChange>) -> Option<EventEntry> {
    let staged = &captured.staged;
    let action = AuditAction::try_from(staged.kind).ok()?;

    let primary_key: FieldMap = staged
        .fields
        .iter()
        .filter(|f| f.is_primary_key)
        .map(|f| {
            let value = if action == AuditAction::Delete {
                f.original.clone()
            } else {
                f.current.clone()
            };
            (f.name.clone(), value)
        })
        .collect();

    Some(EventEntry {
        schema: captured.table.schema.clone(),
        table: captured.table.table.clone(),
        action,
        primary_key,
        changes,
        column_values: staged.current_values(),
        entity: Some(staged.entity.handle),
    })
}
