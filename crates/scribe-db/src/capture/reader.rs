//! ChangeSetReader: the audit-relevant slice of a store's tracked state.

use scribe_core::entities::{StagedEntity, TRANSACTION_LOG_TYPE};
use scribe_schema::{EntityRegistry, ResolvedTable};

use crate::error::StoreError;
use crate::store::TransactionalStore;

/// A staged entity together with the table it writes to.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedEntity {
    pub staged: StagedEntity,
    pub table: ResolvedTable,
}

pub struct ChangeSetReader<'a> {
    registry: &'a EntityRegistry,
}

impl<'a> ChangeSetReader<'a> {
    #[must_use]
    pub const fn new(registry: &'a EntityRegistry) -> Self {
        Self { registry }
    }

    /// Inserted, updated and deleted entities in tracking order. Audit rows
    /// themselves are never returned.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot enumerate its entities.
    pub async fn read<S: TransactionalStore>(
        &self,
        store: &mut S,
    ) -> Result<Vec<CapturedEntity>, StoreError> {
        let tracked = store.enumerate_tracked_entities().await?;
        Ok(self.select(tracked))
    }

    /// Filter and resolve already-enumerated entities.
    #[must_use]
    pub fn select(&self, tracked: Vec<StagedEntity>) -> Vec<CapturedEntity> {
        tracked
            .into_iter()
            .filter(|s| s.kind.is_auditable() && !is_audit_row(s))
            .map(|staged| {
                let table = self.registry.resolve(&staged.entity);
                CapturedEntity { staged, table }
            })
            .collect()
    }
}

fn is_audit_row(staged: &StagedEntity) -> bool {
    staged.entity.entity_type == TRANSACTION_LOG_TYPE
        || staged.entity.base_type.as_deref() == Some(TRANSACTION_LOG_TYPE)
}
