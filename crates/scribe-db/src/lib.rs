//! # scribe-db
//!
//! Audited persistence on libSQL.
//!
//! A [`UnitOfWork`] tracks pending inserts, updates and deletes. The
//! [`PersistenceOrchestrator`] commits them and then writes one
//! `transaction_log` row per real change in a second commit, recording who
//! changed what and when. Capture, diffing and audit-row construction live
//! in [`capture`]; the recursion guard that keeps audit rows from being
//! audited lives in [`guard`].
//!
//! Uses the `libsql` crate (C `SQLite` fork, v0.9.29).

pub mod capture;
pub mod error;
pub mod guard;
pub mod helpers;
mod migrations;
pub mod orchestrator;
pub mod repos;
pub mod service;
pub mod store;
mod unit_of_work;

#[cfg(test)]
mod test_support;

pub use guard::{CancelFlag, RecursionGuard, SaveContext};
pub use orchestrator::{PersistenceOrchestrator, SaveReport, SaveWarning};
pub use service::ScribeService;
pub use store::TransactionalStore;
pub use unit_of_work::UnitOfWork;

use error::DatabaseError;
use libsql::Builder;

/// Database handle: one libSQL database and the connection every unit of
/// work shares.
///
/// In-memory databases exist per connection, so units of work clone this
/// connection instead of opening their own. Transactions on it must not
/// overlap; [`ScribeService::save_with_audit`] runs saves one at a time.
pub struct ScribeDb {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
}

impl ScribeDb {
    /// Open a local database at the given path, or `":memory:"`.
    ///
    /// Runs migrations automatically on open.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or
    /// migrations fail.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;

        let scribe_db = Self { db, conn };
        scribe_db.run_migrations().await?;
        Ok(scribe_db)
    }

    /// Access the underlying libSQL connection for direct queries.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }
}
