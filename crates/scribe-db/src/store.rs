//! The transactional store seam.
//!
//! The save pipeline never touches SQL directly. It asks a store for the
//! entities it is tracking, tells it to commit, reads generated keys back
//! and hands it audit rows to stage. [`crate::UnitOfWork`] is the libSQL
//! implementation; tests substitute in-memory doubles.

use std::future::Future;

use scribe_core::FieldMap;
use scribe_core::entities::{EntityHandle, StagedEntity, TransactionLog};

use crate::error::StoreError;

/// A unit of work that tracks pending mutations and commits them atomically.
pub trait TransactionalStore: Send {
    /// Every tracked entity with its mutation kind and field values, in
    /// tracking order. Unchanged and detached entities may be included.
    fn enumerate_tracked_entities(
        &mut self,
    ) -> impl Future<Output = Result<Vec<StagedEntity>, StoreError>> + Send;

    /// Commit all pending mutations as one unit. On failure nothing is
    /// persisted.
    fn commit(&mut self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Primary-key values of an entity as known after the last commit.
    fn resolve_primary_key(
        &mut self,
        entity: EntityHandle,
    ) -> impl Future<Output = Result<FieldMap, StoreError>> + Send;

    /// Stage audit rows for insertion into `table` on the next commit.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the rows cannot be tracked.
    fn add_rows(&mut self, table: &str, rows: Vec<TransactionLog>) -> Result<(), StoreError>;
}
