//! Audit data model.
//!
//! `StagedEntity` is what a unit of work reports before commit,
//! `EventEntry` is the in-memory audit record built from it, and
//! `TransactionLog` is the durable row appended to `transaction_log`.
//! Each save owns its own set; nothing here is shared across saves.

mod employee;
mod event_entry;
mod staged;
mod transaction_log;

pub use employee::{Employee, EmployeeUpdate, NewEmployee};
pub use event_entry::{EventEntry, EventEntryChange};
pub use staged::{EntityHandle, EntityRef, StagedEntity, TrackedField};
pub use transaction_log::{BuiltLog, TRANSACTION_LOG_TABLE, TRANSACTION_LOG_TYPE, TransactionLog};
