//! Service layer tying the database, registries and orchestrator together.
//!
//! `ScribeService` owns the `ScribeDb` handle, the entity registry, the audit
//! `SchemaRegistry` and one `PersistenceOrchestrator`. Repo methods are
//! implemented as `impl ScribeService` blocks under [`crate::repos`].

use std::sync::Arc;

use scribe_core::identity::ActorProvider;
use scribe_schema::{EntityRegistry, SchemaRegistry};
use tokio::sync::Mutex;

use crate::ScribeDb;
use crate::error::{DatabaseError, SaveError};
use crate::orchestrator::{PersistenceOrchestrator, SaveReport};
use crate::unit_of_work::UnitOfWork;

/// Audited access to a Scribe database.
///
/// Every mutation follows the same protocol:
/// 1. Open a unit of work on the shared connection
/// 2. Stage inserts, edits or deletes
/// 3. `save_with_audit`: commit, then commit one audit row per change
///
/// Units of work share one connection, so saves run one at a time: a save
/// holds `save_lock` across both of its commits.
pub struct ScribeService {
    db: ScribeDb,
    registry: Arc<EntityRegistry>,
    schema: SchemaRegistry,
    orchestrator: PersistenceOrchestrator,
    save_lock: Mutex<()>,
}

impl ScribeService {
    /// Open a local database and build a service over it.
    ///
    /// # Arguments
    ///
    /// * `db_path` - Path to the libSQL database file, or `":memory:"` for tests.
    /// * `actor` - Source of the user name recorded on audit rows.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn new_local(
        db_path: &str,
        actor: Arc<dyn ActorProvider>,
    ) -> Result<Self, DatabaseError> {
        let db = ScribeDb::open_local(db_path).await?;
        Ok(Self::from_db(db, actor))
    }

    /// Create from an existing `ScribeDb` with the default entity mappings.
    #[must_use]
    pub fn from_db(db: ScribeDb, actor: Arc<dyn ActorProvider>) -> Self {
        let registry = Arc::new(EntityRegistry::with_defaults());
        let orchestrator = PersistenceOrchestrator::new(Arc::clone(&registry), actor);
        Self {
            db,
            registry,
            schema: SchemaRegistry::new(),
            orchestrator,
            save_lock: Mutex::new(()),
        }
    }

    /// Override the user name recorded when no actor resolves.
    #[must_use]
    pub fn with_system_actor(mut self, name: impl Into<String>) -> Self {
        self.orchestrator = self.orchestrator.with_system_actor(name);
        self
    }

    #[must_use]
    pub const fn db(&self) -> &ScribeDb {
        &self.db
    }

    #[must_use]
    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Access the audit schema registry.
    #[must_use]
    pub const fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }

    #[must_use]
    pub const fn orchestrator(&self) -> &PersistenceOrchestrator {
        &self.orchestrator
    }

    /// A fresh unit of work on the service's connection.
    #[must_use]
    pub fn unit_of_work(&self) -> UnitOfWork {
        UnitOfWork::new(self.db.conn().clone(), Arc::clone(&self.registry))
    }

    /// Commit a unit of work together with its audit rows.
    ///
    /// Waits for any save already in progress on this service.
    ///
    /// # Errors
    ///
    /// See [`PersistenceOrchestrator::save_with_audit`].
    pub async fn save_with_audit(&self, uow: &mut UnitOfWork) -> Result<SaveReport, SaveError> {
        let _save = self.save_lock.lock().await;
        self.orchestrator.save_with_audit(uow).await
    }
}
