//! Repository modules for the demo entity and the audit trail.
//!
//! Each module adds methods to `ScribeService` via `impl ScribeService` blocks.

pub mod employee;
pub mod transaction_log;

pub use transaction_log::TransactionLogFilter;
