//! Change capture: tracked entities → event entries.
//!
//! ```text
//! ChangeSetReader → Differ → AuditRecordBuilder
//! ```
//!
//! Runs once per save, before the original commit. No-op updates are
//! dropped here, so every entry that comes out becomes exactly one audit row.

pub mod builder;
pub mod differ;
pub mod reader;

use scribe_core::entities::EventEntry;
use scribe_schema::EntityRegistry;
use tracing::debug;

use crate::error::StoreError;
use crate::store::TransactionalStore;

pub use builder::build_event_entry;
pub use differ::diff;
pub use reader::{CapturedEntity, ChangeSetReader};

/// Capture the pending changes of a store as event entries.
///
/// # Errors
///
/// Returns `StoreError` if the store cannot enumerate its tracked entities.
pub async fn capture_changes<S: TransactionalStore>(
    registry: &EntityRegistry,
    store: &mut S,
) -> Result<Vec<EventEntry>, StoreError> {
    let captured = ChangeSetReader::new(registry).read(store).await?;
    let staged = captured.len();

    let entries: Vec<EventEntry> = captured
        .iter()
        .filter_map(|c| {
            let changes = diff(&c.staged)?;
            build_event_entry(c, changes)
        })
        .collect();

    debug!(
        staged,
        entries = entries.len(),
        suppressed = staged - entries.len(),
        "capture: event entries built"
    );
    Ok(entries)
}
