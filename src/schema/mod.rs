//! Compiled schema subsystem
//!
//! Schemas describe the expected shape of untyped data. They are built
//! once, shared through `Arc`, and drive both the loader and the dumper.
//!
//! # Design Principles
//!
//! - Closed tagged union, one tag per shape
//! - Precomputed per-tag data (element types, field descriptors, members)
//! - Uniform field descriptors; no per-class introspection in the core
//! - Builders validate at construction time

mod errors;
mod record;
mod types;

pub use errors::{SchemaError, SchemaResult};
pub use record::{
    FieldDefault, FieldDescriptor, RecordBuilder, RecordSchema, NAME_METADATA_KEY,
};
pub use types::{EnumBuilder, EnumSchema, EnumVariant, LiteralValue, ScalarKind, Schema, SpecialKind};
