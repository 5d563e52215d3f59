//! Record schemas and field descriptors
//!
//! A record is a structured type with a fixed named field set. Each field
//! is described by a uniform [`FieldDescriptor`]; the engine never looks at
//! anything else, so any external class system can participate by emitting
//! descriptors through the builder.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::errors::{SchemaError, SchemaResult};
use super::types::Schema;
use crate::value::TypedValue;

/// Conventional metadata key carrying the external (wire) field name
pub const NAME_METADATA_KEY: &str = "name";

/// Default source for a record field
#[derive(Clone)]
pub enum FieldDefault {
    /// No default, the field must be present
    Required,
    /// A fixed default value
    Value(TypedValue),
    /// A factory invoked once per construction
    Factory(Arc<dyn Fn() -> TypedValue>),
}

impl FieldDefault {
    /// Whether the field must be present in the input
    pub fn is_required(&self) -> bool {
        matches!(self, FieldDefault::Required)
    }

    /// Produces the default value, if the field has one.
    pub fn produce(&self) -> Option<TypedValue> {
        match self {
            FieldDefault::Required => None,
            FieldDefault::Value(v) => Some(v.clone()),
            FieldDefault::Factory(f) => Some(f()),
        }
    }
}

impl fmt::Debug for FieldDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldDefault::Required => write!(f, "Required"),
            FieldDefault::Value(v) => write!(f, "Value({:?})", v),
            FieldDefault::Factory(_) => write!(f, "Factory(..)"),
        }
    }
}

impl PartialEq for FieldDefault {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldDefault::Required, FieldDefault::Required) => true,
            (FieldDefault::Value(a), FieldDefault::Value(b)) => a == b,
            // Factories compare by identity
            (FieldDefault::Factory(a), FieldDefault::Factory(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Uniform description of one record field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Internal (declared) field name
    pub name: String,
    /// Declared field type
    pub schema: Arc<Schema>,
    /// Default source; `Required` makes the field mandatory
    pub default: FieldDefault,
    /// Free-form metadata; the loader's mangle key selects the external name
    pub metadata: BTreeMap<String, String>,
}

impl FieldDescriptor {
    /// Returns the external name under the given mangle key, falling back
    /// to the internal name.
    pub fn external_name(&self, mangle_key: &str) -> &str {
        self.metadata
            .get(mangle_key)
            .map(String::as_str)
            .unwrap_or(&self.name)
    }
}

/// Schema of a record type: a name and an ordered field set
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    /// Unique record name, also used for forward references
    pub name: String,
    /// Field descriptors in declaration order
    pub fields: Vec<FieldDescriptor>,
}

impl RecordSchema {
    /// Starts building a record schema with the given name.
    pub fn builder(name: impl Into<String>) -> RecordBuilder {
        RecordBuilder {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Returns the position of the named field.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Returns the descriptor of the named field.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Builder for [`RecordSchema`]
pub struct RecordBuilder {
    name: String,
    fields: Vec<FieldDescriptor>,
}

impl RecordBuilder {
    /// Adds a required field.
    pub fn field(mut self, name: impl Into<String>, schema: Arc<Schema>) -> Self {
        self.fields.push(FieldDescriptor {
            name: name.into(),
            schema,
            default: FieldDefault::Required,
            metadata: BTreeMap::new(),
        });
        self
    }

    /// Adds an optional field with a fixed default value.
    pub fn optional(
        mut self,
        name: impl Into<String>,
        schema: Arc<Schema>,
        default: TypedValue,
    ) -> Self {
        self.fields.push(FieldDescriptor {
            name: name.into(),
            schema,
            default: FieldDefault::Value(default),
            metadata: BTreeMap::new(),
        });
        self
    }

    /// Adds an optional field whose default is produced by a factory.
    pub fn optional_with(
        mut self,
        name: impl Into<String>,
        schema: Arc<Schema>,
        factory: impl Fn() -> TypedValue + 'static,
    ) -> Self {
        self.fields.push(FieldDescriptor {
            name: name.into(),
            schema,
            default: FieldDefault::Factory(Arc::new(factory)),
            metadata: BTreeMap::new(),
        });
        self
    }

    /// Adds a required field with an external-name override.
    pub fn renamed(
        mut self,
        name: impl Into<String>,
        external: impl Into<String>,
        schema: Arc<Schema>,
    ) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert(NAME_METADATA_KEY.to_string(), external.into());
        self.fields.push(FieldDescriptor {
            name: name.into(),
            schema,
            default: FieldDefault::Required,
            metadata,
        });
        self
    }

    /// Adds a pre-built descriptor, for adapter-produced fields.
    pub fn descriptor(mut self, descriptor: FieldDescriptor) -> Self {
        self.fields.push(descriptor);
        self
    }

    /// Attaches a metadata entry to the most recently added field.
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let Some(last) = self.fields.last_mut() {
            last.metadata.insert(key.into(), value.into());
        }
        self
    }

    /// Validates the field set and builds the schema.
    pub fn build(self) -> SchemaResult<Arc<Schema>> {
        for (i, f) in self.fields.iter().enumerate() {
            for other in &self.fields[i + 1..] {
                if f.name == other.name {
                    return Err(SchemaError::DuplicateField(self.name, f.name.clone()));
                }
                let a = f.external_name(NAME_METADATA_KEY);
                let b = other.external_name(NAME_METADATA_KEY);
                if a == b {
                    return Err(SchemaError::DuplicateExternalName(self.name, a.to_string()));
                }
            }
        }
        Ok(Arc::new(Schema::Record(Arc::new(RecordSchema {
            name: self.name,
            fields: self.fields,
        }))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_orders_fields() {
        let schema = RecordSchema::builder("Point")
            .field("x", Schema::int())
            .field("y", Schema::int())
            .build()
            .unwrap();
        let Schema::Record(rec) = &*schema else {
            panic!("expected record schema");
        };
        assert_eq!(rec.fields[0].name, "x");
        assert_eq!(rec.index_of("y"), Some(1));
        assert!(rec.fields[0].default.is_required());
    }

    #[test]
    fn test_builder_rejects_duplicate_fields() {
        let result = RecordSchema::builder("Point")
            .field("x", Schema::int())
            .field("x", Schema::int())
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_rejects_colliding_external_names() {
        let result = RecordSchema::builder("Row")
            .renamed("internal_a", "col", Schema::int())
            .renamed("internal_b", "col", Schema::int())
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_external_name_falls_back_to_internal() {
        let schema = RecordSchema::builder("Row")
            .renamed("type_", "type", Schema::str_())
            .field("plain", Schema::int())
            .build()
            .unwrap();
        let Schema::Record(rec) = &*schema else {
            panic!("expected record schema");
        };
        assert_eq!(rec.fields[0].external_name(NAME_METADATA_KEY), "type");
        assert_eq!(rec.fields[1].external_name(NAME_METADATA_KEY), "plain");
    }

    #[test]
    fn test_factory_default_produces_fresh_values() {
        let schema = RecordSchema::builder("Bag")
            .optional_with("items", Schema::list(Schema::int()), || {
                TypedValue::List(Vec::new())
            })
            .build()
            .unwrap();
        let Schema::Record(rec) = &*schema else {
            panic!("expected record schema");
        };
        assert_eq!(
            rec.fields[0].default.produce(),
            Some(TypedValue::List(Vec::new()))
        );
    }
}
