//! PersistenceOrchestrator: the audited save.
//!
//! ```text
//! Idle → Capturing → CommittingOriginals → ResolvingKeys
//!      → BuildingAuditRows → CommittingAudit → Idle
//! ```
//!
//! Audit rows are committed by re-entering the same pipeline with the save
//! context suspended, so the nested pass commits them without capturing
//! anything. Everything before the original commit aborts the save; nothing
//! after it rolls committed data back.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::Utc;
use scribe_core::entities::{EventEntry, TRANSACTION_LOG_TABLE, TransactionLog};
use scribe_core::enums::AuditAction;
use scribe_core::identity::{ActorProvider, SYSTEM_ACTOR, resolve_actor};
use scribe_schema::EntityRegistry;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::capture::capture_changes;
use crate::error::{SaveError, StoreError};
use crate::guard::{CancelFlag, SaveContext};
use crate::store::TransactionalStore;

/// Outcome of a successful save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    /// Event entries captured (after no-op suppression).
    pub captured: usize,
    /// Audit rows committed.
    pub audited: usize,
    pub warnings: Vec<SaveWarning>,
}

impl SaveReport {
    /// Whether any audit row was written with degraded content.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// A problem that degraded an audit row without failing the save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SaveWarning {
    /// A generated key could not be read back; the row keeps the
    /// pre-commit key.
    KeyResolution { table: String, reason: String },
    /// Values replaced by the placeholder marker.
    Serialization { table: String, fields: Vec<String> },
}

impl fmt::Display for SaveWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyResolution { table, reason } => {
                write!(f, "{table}: generated key not resolved ({reason})")
            }
            Self::Serialization { table, fields } => {
                write!(f, "{table}: unserializable values in {}", fields.join(", "))
            }
        }
    }
}

type SaveFuture<'a> = Pin<Box<dyn Future<Output = Result<SaveReport, SaveError>> + Send + 'a>>;

/// Runs audited saves against any [`TransactionalStore`].
///
/// Holds no per-save state; one orchestrator can serve concurrent saves on
/// different stores.
pub struct PersistenceOrchestrator {
    registry: Arc<EntityRegistry>,
    actor: Arc<dyn ActorProvider>,
    system_actor: String,
}

impl PersistenceOrchestrator {
    #[must_use]
    pub fn new(registry: Arc<EntityRegistry>, actor: Arc<dyn ActorProvider>) -> Self {
        Self {
            registry,
            actor,
            system_actor: SYSTEM_ACTOR.to_string(),
        }
    }

    /// Override the user name recorded when no actor resolves.
    #[must_use]
    pub fn with_system_actor(mut self, name: impl Into<String>) -> Self {
        self.system_actor = name.into();
        self
    }

    #[must_use]
    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Commit the store's pending changes and their audit rows.
    ///
    /// # Errors
    ///
    /// `SaveError::Capture` or `SaveError::StoreCommit` when nothing was
    /// committed; `SaveError::AuditCommit` when the data change is committed
    /// but its audit rows are not.
    pub async fn save_with_audit<S: TransactionalStore>(
        &self,
        store: &mut S,
    ) -> Result<SaveReport, SaveError> {
        let ctx = SaveContext::new();
        self.save_in(store, &ctx).await
    }

    /// Like [`Self::save_with_audit`], honoring `cancel` until the original
    /// commit completes.
    ///
    /// # Errors
    ///
    /// Same as [`Self::save_with_audit`], plus `SaveError::Cancelled`.
    pub async fn save_with_audit_cancellable<S: TransactionalStore>(
        &self,
        store: &mut S,
        cancel: &CancelFlag,
    ) -> Result<SaveReport, SaveError> {
        let ctx = SaveContext::with_cancel(cancel.clone());
        self.save_in(store, &ctx).await
    }

    fn save_in<'a, S: TransactionalStore>(
        &'a self,
        store: &'a mut S,
        ctx: &'a SaveContext,
    ) -> SaveFuture<'a> {
        Box::pin(async move {
            let nested = ctx.is_suspended();

            let mut entries = if nested {
                debug!("save: capture suspended");
                Vec::new()
            } else {
                if ctx.is_cancelled() {
                    info!("save: cancelled before capture");
                    return Err(SaveError::Cancelled);
                }
                capture_changes(&self.registry, store)
                    .await
                    .map_err(|source| SaveError::Capture { source })?
            };
            let captured = entries.len();

            if !nested && ctx.is_cancelled() {
                info!(captured, "save: cancelled before commit");
                return Err(SaveError::Cancelled);
            }
            store.commit().await.map_err(|source| {
                warn!(error = %source, nested, "save: commit failed");
                SaveError::StoreCommit { source }
            })?;

            if entries.is_empty() {
                return Ok(SaveReport::default());
            }

            let mut warnings = Vec::new();
            resolve_keys(store, &mut entries, &mut warnings).await;
            let rows = self.build_rows(&entries, &mut warnings);
            let audited = rows.len();
            self.commit_audit(store, ctx, rows).await?;

            debug!(captured, audited, warnings = warnings.len(), "save: complete");
            Ok(SaveReport {
                captured,
                audited,
                warnings,
            })
        })
    }

    fn build_rows(&self, entries: &[EventEntry], warnings: &mut Vec<SaveWarning>) -> Vec<TransactionLog> {
        let user = resolve_actor(self.actor.as_ref(), &self.system_actor);
        let now = Utc::now();
        let mut rows = Vec::with_capacity(entries.len());
        for entry in entries {
            let built = TransactionLog::from_event_entry(entry, now, user.as_str());
            if !built.degraded.is_empty() {
                warnings.push(SaveWarning::Serialization {
                    table: entry.table.clone(),
                    fields: built.degraded,
                });
            }
            rows.push(built.log);
        }
        rows
    }

    async fn commit_audit<S: TransactionalStore>(
        &self,
        store: &mut S,
        ctx: &SaveContext,
        rows: Vec<TransactionLog>,
    ) -> Result<(), SaveError> {
        let unaudited = rows.len();
        let _guard = ctx.suspend();

        store
            .add_rows(TRANSACTION_LOG_TABLE, rows)
            .map_err(|source| audit_failure(unaudited, source))?;
        self.save_in(store, ctx)
            .await
            .map_err(|e| audit_failure(unaudited, e.into_store_error()))?;
        Ok(())
    }
}

/// Backfill generated keys of inserts. Failures become warnings.
async fn resolve_keys<S: TransactionalStore>(
    store: &mut S,
    entries: &mut [EventEntry],
    warnings: &mut Vec<SaveWarning>,
) {
    for entry in entries.iter_mut().filter(|e| e.action == AuditAction::Insert) {
        let Some(handle) = entry.entity else {
            continue;
        };
        match store.resolve_primary_key(handle).await {
            Ok(key) => entry.backfill_primary_key(&key),
            Err(e) => {
                warn!(table = %entry.table, entity = %handle, error = %e, "save: key resolution failed");
                warnings.push(SaveWarning::KeyResolution {
                    table: entry.table.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }
}

fn audit_failure(unaudited: usize, source: StoreError) -> SaveError {
    error!(unaudited, error = %source, "save: changes committed without audit rows");
    SaveError::AuditCommit { unaudited, source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::memory::{MemoryStore, employee_insert, employee_row};
    use pretty_assertions::assert_eq;
    use scribe_core::FieldValue;
    use scribe_core::entities::TrackedField;
    use scribe_core::enums::MutationKind;
    use scribe_core::identity::FixedActor;

    fn orchestrator() -> PersistenceOrchestrator {
        PersistenceOrchestrator::new(
            Arc::new(EntityRegistry::with_defaults()),
            Arc::new(FixedActor::anonymous()),
        )
    }

    #[tokio::test]
    async fn insert_is_audited_with_resolved_key() {
        let mut store = MemoryStore::new(vec![employee_insert(1, "John", "Don")]);
        let report = orchestrator().save_with_audit(&mut store).await.unwrap();

        assert_eq!(report.captured, 1);
        assert_eq!(report.audited, 1);
        assert!(!report.is_degraded());
        let log = &store.committed_logs[0];
        assert_eq!(log.action, AuditAction::Insert);
        assert_eq!(log.table_name, "employees");
        assert_eq!(log.table_pk.as_deref(), Some("100"));
        assert_eq!(log.old_values, None);
        assert_eq!(
            log.new_values.as_deref(),
            Some(r#"{"first_name":"John","last_name":"Don","id":100}"#)
        );
        assert_eq!(log.user_name, "system");
    }

    #[tokio::test]
    async fn no_op_update_commits_without_audit() {
        let mut store = MemoryStore::new(vec![employee_row(
            MutationKind::Update,
            4,
            vec![TrackedField::new("last_name", "Don".into(), "Don".into())],
        )]);
        let report = orchestrator().save_with_audit(&mut store).await.unwrap();

        assert_eq!(report, SaveReport::default());
        assert!(store.committed_logs.is_empty());
        assert_eq!(store.commit_calls, 1);
    }

    #[tokio::test]
    async fn failed_original_commit_writes_nothing() {
        let mut store = MemoryStore::new(vec![employee_insert(1, "John", "Don")]);
        store.fail_commit_on = Some(1);

        let err = orchestrator().save_with_audit(&mut store).await.unwrap_err();
        assert!(matches!(err, SaveError::StoreCommit { .. }));
        assert!(!err.data_committed());
        assert!(store.committed_logs.is_empty());
        assert_eq!(store.add_rows_calls, 0);
    }

    #[tokio::test]
    async fn failed_audit_commit_is_distinct_and_releases_guard() {
        let mut store = MemoryStore::new(vec![employee_insert(1, "John", "Don")]);
        store.fail_commit_on = Some(2);

        let orch = orchestrator();
        let ctx = SaveContext::new();
        let err = orch.save_in(&mut store, &ctx).await.unwrap_err();

        assert!(err.data_committed());
        assert!(matches!(err, SaveError::AuditCommit { unaudited: 1, .. }));
        assert!(store.committed_logs.is_empty());
        assert!(!ctx.is_suspended());
    }

    #[tokio::test]
    async fn key_resolution_failure_degrades_row() {
        let mut store = MemoryStore::new(vec![employee_insert(1, "John", "Don")]);
        store.fail_key_resolution = true;

        let report = orchestrator().save_with_audit(&mut store).await.unwrap();
        assert_eq!(report.audited, 1);
        assert!(matches!(report.warnings[0], SaveWarning::KeyResolution { .. }));
        let log = &store.committed_logs[0];
        assert_eq!(log.table_pk, None);
        assert_eq!(
            log.new_values.as_deref(),
            Some(r#"{"first_name":"John","last_name":"Don","id":null}"#)
        );
    }

    #[tokio::test]
    async fn unencodable_value_degrades_row() {
        let mut store = MemoryStore::new(vec![employee_row(
            MutationKind::Update,
            4,
            vec![TrackedField::new("score", 1.0_f64.into(), f64::NAN.into())],
        )]);

        let report = orchestrator().save_with_audit(&mut store).await.unwrap();
        assert_eq!(
            report.warnings,
            vec![SaveWarning::Serialization {
                table: "employees".into(),
                fields: vec!["score".into()],
            }]
        );
        assert_eq!(store.committed_logs.len(), 1);
    }

    #[tokio::test]
    async fn cancellation_before_commit_aborts() {
        let mut store = MemoryStore::new(vec![employee_insert(1, "John", "Don")]);
        let cancel = CancelFlag::new();
        cancel.cancel();

        let err = orchestrator()
            .save_with_audit_cancellable(&mut store, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, SaveError::Cancelled));
        assert_eq!(store.commit_calls, 0);
        assert!(store.committed_logs.is_empty());
    }

    #[tokio::test]
    async fn capture_failure_aborts_before_commit() {
        let mut store = MemoryStore::new(vec![employee_insert(1, "John", "Don")]);
        store.fail_enumerate = true;

        let err = orchestrator().save_with_audit(&mut store).await.unwrap_err();
        assert!(matches!(err, SaveError::Capture { .. }));
        assert_eq!(store.commit_calls, 0);
    }

    #[tokio::test]
    async fn audit_rows_are_never_audited() {
        let mut store = MemoryStore::new(vec![employee_insert(1, "John", "Don")]);
        store.sticky = true;

        let report = orchestrator().save_with_audit(&mut store).await.unwrap();
        assert_eq!(report.audited, 1);
        assert_eq!(store.committed_logs.len(), 1);
        assert_eq!(store.enumerate_calls, 1);
        assert_eq!(store.commit_calls, 2);
    }

    #[tokio::test]
    async fn actor_is_recorded() {
        let orch = PersistenceOrchestrator::new(
            Arc::new(EntityRegistry::with_defaults()),
            Arc::new(FixedActor::named("alice")),
        );
        let mut store = MemoryStore::new(vec![employee_row(
            MutationKind::Delete,
            4,
            vec![TrackedField::new("last_name", "Don".into(), FieldValue::Null)],
        )]);
        orch.save_with_audit(&mut store).await.unwrap();

        let log = &store.committed_logs[0];
        assert_eq!(log.user_name, "alice");
        assert_eq!(log.action, AuditAction::Delete);
        assert_eq!(log.new_values, None);
        assert_eq!(
            log.old_values.as_deref(),
            Some(r#"{"id":4,"last_name":"Don"}"#)
        );
    }

    #[tokio::test]
    async fn fallback_actor_is_configurable() {
        let orch = orchestrator().with_system_actor("importer");
        let mut store = MemoryStore::new(vec![employee_insert(1, "John", "Don")]);
        orch.save_with_audit(&mut store).await.unwrap();
        assert_eq!(store.committed_logs[0].user_name, "importer");
    }

    #[tokio::test]
    async fn concurrent_saves_keep_separate_guards() {
        let orch = orchestrator();
        let mut a = MemoryStore::new(vec![employee_insert(1, "Ann", "Lee")]);
        let mut b = MemoryStore::new(vec![employee_insert(1, "Bo", "Kim")]);

        let (ra, rb) = tokio::join!(orch.save_with_audit(&mut a), orch.save_with_audit(&mut b));
        assert_eq!(ra.unwrap().audited, 1);
        assert_eq!(rb.unwrap().audited, 1);
        assert_eq!(a.committed_logs.len(), 1);
        assert_eq!(b.committed_logs.len(), 1);
    }
}
