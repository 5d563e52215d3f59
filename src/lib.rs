//! strictload: type-directed loading of untyped nested data
//!
//! Plain values (as parsed from JSON, YAML, msgpack and the like) are
//! loaded against compiled schemas into typed values, with casting,
//! structured path-carrying errors, deterministic union resolution and a
//! mirrored dumper.
//!
//! ```
//! use serde_json::json;
//! use strictload::{load, Schema, TypedValue};
//!
//! let schema = Schema::list(Schema::int());
//! let loaded = load(&json!([1, "2", 3]), &schema).unwrap();
//! assert_eq!(
//!     loaded,
//!     TypedValue::List(vec![
//!         TypedValue::Int(1),
//!         TypedValue::Int(2),
//!         TypedValue::Int(3),
//!     ])
//! );
//! ```

pub mod dumper;
pub mod errors;
pub mod loader;
pub mod schema;
pub mod value;

use std::sync::Arc;

use serde_json::Value;

pub use dumper::{DumpEntry, Dumper};
pub use errors::{Annotation, AnnotationKey, AnnotationKind, Error, ErrorKind, LoadResult, TraceItem};
pub use loader::{LoadEntry, Loader};
pub use schema::{
    EnumSchema, FieldDefault, FieldDescriptor, LiteralValue, RecordSchema, ScalarKind, Schema,
    SchemaError, SpecialKind,
};
pub use value::{EnumValue, RecordValue, TypedValue};

/// Loads a plain value against a schema with a default-configured loader.
pub fn load(value: &Value, schema: &Arc<Schema>) -> LoadResult<TypedValue> {
    Loader::new().load(value, schema)
}

/// Dumps a typed value back into a plain one with a default-configured
/// dumper.
pub fn dump(value: &TypedValue) -> LoadResult<Value> {
    Dumper::new().dump(value)
}
