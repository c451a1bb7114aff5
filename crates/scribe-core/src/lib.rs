//! # scribe-core
//!
//! Core types, field values, and error types for Scribe.
//!
//! This crate provides the foundational types shared across all Scribe crates:
//! - Typed field values and the ordered field map used for diffs and snapshots
//! - Mutation kinds and audit actions
//! - The audit data model (staged entities, event entries, transaction logs)
//! - Actor lookup for attributing audit rows
//! - The deterministic field-map serializer stored in `old_values`/`new_values`
//! - Cross-cutting error types

pub mod entities;
pub mod enums;
pub mod errors;
pub mod identity;
pub mod serializer;
pub mod value;

pub use value::{FieldMap, FieldValue};
