//! # scribe-schema
//!
//! Entity registry and audit JSON Schemas for Scribe.
//!
//! This crate provides:
//! - `EntityRegistry`: explicit mapping from entity type to table, schema,
//!   primary-key columns and generated-key flag, built once at startup and
//!   consulted instead of runtime type inspection
//! - `SchemaRegistry`: JSON Schemas for the audit types in `scribe-core`,
//!   with validation and export (`scribe schema`)

pub mod entity;
pub mod error;
pub mod registry;

pub use entity::{EntityMapping, EntityRegistry, ResolutionSource, ResolvedTable};
pub use error::SchemaError;
pub use registry::SchemaRegistry;
