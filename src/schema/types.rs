//! Compiled schema types
//!
//! A schema is a closed tagged description of the expected shape of a
//! value, built once per declared type and shared through `Arc`. Each tag
//! carries its own precomputed data (element type, field descriptors,
//! member list), so dispatch is a single match instead of repeated
//! introspection.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::errors::{SchemaError, SchemaResult};
use super::record::RecordSchema;

/// Basic scalar kinds requiring no further decomposition
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    Null,
    Bool,
    Int,
    Float,
    Str,
}

impl ScalarKind {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            ScalarKind::Null => "null",
            ScalarKind::Bool => "bool",
            ScalarKind::Int => "int",
            ScalarKind::Float => "float",
            ScalarKind::Str => "str",
        }
    }
}

/// A member of a finite literal set
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Bool(b) => write!(f, "{}", b),
            LiteralValue::Int(i) => write!(f, "{}", i),
            LiteralValue::Str(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<bool> for LiteralValue {
    fn from(v: bool) -> Self {
        LiteralValue::Bool(v)
    }
}

impl From<i64> for LiteralValue {
    fn from(v: i64) -> Self {
        LiteralValue::Int(v)
    }
}

impl From<&str> for LiteralValue {
    fn from(v: &str) -> Self {
        LiteralValue::Str(v.to_string())
    }
}

impl From<String> for LiteralValue {
    fn from(v: String) -> Self {
        LiteralValue::Str(v)
    }
}

/// Leaf types constructed from a single string or number argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecialKind {
    Date,
    Time,
    DateTime,
    Duration,
    Path,
    IpAddr,
    SocketAddr,
    Uuid,
    Pattern,
}

impl SpecialKind {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            SpecialKind::Date => "date",
            SpecialKind::Time => "time",
            SpecialKind::DateTime => "datetime",
            SpecialKind::Duration => "duration",
            SpecialKind::Path => "path",
            SpecialKind::IpAddr => "ipaddr",
            SpecialKind::SocketAddr => "socketaddr",
            SpecialKind::Uuid => "uuid",
            SpecialKind::Pattern => "pattern",
        }
    }
}

/// Declared expected shape for a value
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    /// A basic scalar (null, bool, int, float, str)
    Scalar(ScalarKind),
    /// One of a finite set of literal values
    Literal(Vec<LiteralValue>),
    /// Null or the inner type
    Optional(Arc<Schema>),
    /// Homogeneous list
    List(Arc<Schema>),
    /// Homogeneous set
    Set(Arc<Schema>),
    /// Homogeneous frozen set
    FrozenSet(Arc<Schema>),
    /// Fixed-arity tuple with per-position types
    Tuple(Vec<Arc<Schema>>),
    /// Variadic tuple, like a list but materialized as a tuple
    Variadic(Arc<Schema>),
    /// Mapping with typed keys and values
    Map(Arc<Schema>, Arc<Schema>),
    /// Structured type with a fixed named field set
    Record(Arc<RecordSchema>),
    /// One of several member types
    Union(Vec<Arc<Schema>>),
    /// Named enumeration with per-variant values
    Enum(Arc<EnumSchema>),
    /// Symbolic forward reference resolved through the loader's name table
    Ref(String),
    /// Anything, returned unchanged
    Any,
    /// String/number-constructed leaf type
    Special(SpecialKind),
    /// Named alias unwrapping to the underlying type
    Alias(String, Arc<Schema>),
}

impl Schema {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> String {
        match self {
            Schema::Scalar(k) => k.type_name().to_string(),
            Schema::Literal(values) => {
                let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                format!("literal[{}]", items.join(", "))
            }
            Schema::Optional(inner) => format!("optional[{}]", inner.type_name()),
            Schema::List(t) => format!("list[{}]", t.type_name()),
            Schema::Set(t) => format!("set[{}]", t.type_name()),
            Schema::FrozenSet(t) => format!("frozenset[{}]", t.type_name()),
            Schema::Tuple(items) => {
                let names: Vec<String> = items.iter().map(|t| t.type_name()).collect();
                format!("tuple[{}]", names.join(", "))
            }
            Schema::Variadic(t) => format!("tuple[{}, ...]", t.type_name()),
            Schema::Map(k, v) => format!("map[{}, {}]", k.type_name(), v.type_name()),
            Schema::Record(r) => r.name.clone(),
            Schema::Union(members) => {
                let names: Vec<String> = members.iter().map(|t| t.type_name()).collect();
                format!("union[{}]", names.join(", "))
            }
            Schema::Enum(e) => e.name.clone(),
            Schema::Ref(name) => format!("ref[{}]", name),
            Schema::Any => "any".to_string(),
            Schema::Special(k) => k.type_name().to_string(),
            Schema::Alias(name, _) => name.clone(),
        }
    }

    /// Returns the registrable name of the schema, if it has one.
    ///
    /// Named schemas populate the loader's forward-reference table.
    pub fn name(&self) -> Option<&str> {
        match self {
            Schema::Record(r) => Some(&r.name),
            Schema::Enum(e) => Some(&e.name),
            Schema::Alias(name, _) => Some(name),
            _ => None,
        }
    }

    /// Whether this is a basic scalar shape
    pub fn is_scalar(&self) -> bool {
        matches!(self, Schema::Scalar(_))
    }

    // Constructor helpers, all returning shared schemas.

    pub fn null() -> Arc<Schema> {
        Arc::new(Schema::Scalar(ScalarKind::Null))
    }

    pub fn bool_() -> Arc<Schema> {
        Arc::new(Schema::Scalar(ScalarKind::Bool))
    }

    pub fn int() -> Arc<Schema> {
        Arc::new(Schema::Scalar(ScalarKind::Int))
    }

    pub fn float() -> Arc<Schema> {
        Arc::new(Schema::Scalar(ScalarKind::Float))
    }

    pub fn str_() -> Arc<Schema> {
        Arc::new(Schema::Scalar(ScalarKind::Str))
    }

    pub fn any() -> Arc<Schema> {
        Arc::new(Schema::Any)
    }

    pub fn literal(values: Vec<LiteralValue>) -> Arc<Schema> {
        Arc::new(Schema::Literal(values))
    }

    pub fn optional(inner: Arc<Schema>) -> Arc<Schema> {
        Arc::new(Schema::Optional(inner))
    }

    pub fn list(element: Arc<Schema>) -> Arc<Schema> {
        Arc::new(Schema::List(element))
    }

    pub fn set(element: Arc<Schema>) -> Arc<Schema> {
        Arc::new(Schema::Set(element))
    }

    pub fn frozen_set(element: Arc<Schema>) -> Arc<Schema> {
        Arc::new(Schema::FrozenSet(element))
    }

    pub fn tuple(items: Vec<Arc<Schema>>) -> Arc<Schema> {
        Arc::new(Schema::Tuple(items))
    }

    pub fn variadic(element: Arc<Schema>) -> Arc<Schema> {
        Arc::new(Schema::Variadic(element))
    }

    pub fn map(key: Arc<Schema>, value: Arc<Schema>) -> Arc<Schema> {
        Arc::new(Schema::Map(key, value))
    }

    pub fn union(members: Vec<Arc<Schema>>) -> Arc<Schema> {
        Arc::new(Schema::Union(members))
    }

    pub fn reference(name: impl Into<String>) -> Arc<Schema> {
        Arc::new(Schema::Ref(name.into()))
    }

    pub fn special(kind: SpecialKind) -> Arc<Schema> {
        Arc::new(Schema::Special(kind))
    }

    pub fn date() -> Arc<Schema> {
        Self::special(SpecialKind::Date)
    }

    pub fn time() -> Arc<Schema> {
        Self::special(SpecialKind::Time)
    }

    pub fn datetime() -> Arc<Schema> {
        Self::special(SpecialKind::DateTime)
    }

    pub fn duration() -> Arc<Schema> {
        Self::special(SpecialKind::Duration)
    }

    pub fn path() -> Arc<Schema> {
        Self::special(SpecialKind::Path)
    }

    pub fn ip_addr() -> Arc<Schema> {
        Self::special(SpecialKind::IpAddr)
    }

    pub fn socket_addr() -> Arc<Schema> {
        Self::special(SpecialKind::SocketAddr)
    }

    pub fn uuid() -> Arc<Schema> {
        Self::special(SpecialKind::Uuid)
    }

    pub fn pattern() -> Arc<Schema> {
        Self::special(SpecialKind::Pattern)
    }

    pub fn alias(name: impl Into<String>, inner: Arc<Schema>) -> Arc<Schema> {
        Arc::new(Schema::Alias(name.into(), inner))
    }
}

/// One variant of an enumeration
#[derive(Debug, Clone, PartialEq)]
pub struct EnumVariant {
    /// Variant name
    pub name: String,
    /// The value the variant is encoded as
    pub value: LiteralValue,
    /// Optional value-type hint used as a loading fallback
    pub hint: Option<Arc<Schema>>,
}

/// Named enumeration schema
#[derive(Debug, Clone, PartialEq)]
pub struct EnumSchema {
    /// Unique enum name
    pub name: String,
    /// Declared variants, in order
    pub variants: Vec<EnumVariant>,
}

impl EnumSchema {
    /// Starts building an enum schema with the given name.
    pub fn builder(name: impl Into<String>) -> EnumBuilder {
        EnumBuilder {
            name: name.into(),
            variants: Vec::new(),
        }
    }

    /// Returns the index of the variant encoded as `value`.
    pub fn variant_by_value(&self, value: &LiteralValue) -> Option<usize> {
        self.variants.iter().position(|v| &v.value == value)
    }

    /// Renders the allowed values list for error messages.
    pub fn allowed_values(&self) -> String {
        let items: Vec<String> = self.variants.iter().map(|v| v.value.to_string()).collect();
        items.join(", ")
    }
}

/// Builder for [`EnumSchema`]
pub struct EnumBuilder {
    name: String,
    variants: Vec<EnumVariant>,
}

impl EnumBuilder {
    /// Adds a variant encoded as the given value.
    pub fn variant(mut self, name: impl Into<String>, value: impl Into<LiteralValue>) -> Self {
        self.variants.push(EnumVariant {
            name: name.into(),
            value: value.into(),
            hint: None,
        });
        self
    }

    /// Adds a variant with a value-type hint tried as a loading fallback.
    pub fn variant_with_hint(
        mut self,
        name: impl Into<String>,
        value: impl Into<LiteralValue>,
        hint: Arc<Schema>,
    ) -> Self {
        self.variants.push(EnumVariant {
            name: name.into(),
            value: value.into(),
            hint: Some(hint),
        });
        self
    }

    /// Validates the variant set and builds the schema.
    pub fn build(self) -> SchemaResult<Arc<Schema>> {
        for (i, v) in self.variants.iter().enumerate() {
            for other in &self.variants[i + 1..] {
                if v.name == other.name {
                    return Err(SchemaError::DuplicateVariant(self.name, v.name.clone()));
                }
                if v.value == other.value {
                    return Err(SchemaError::DuplicateVariantValue(
                        self.name,
                        v.value.to_string(),
                    ));
                }
            }
        }
        Ok(Arc::new(Schema::Enum(Arc::new(EnumSchema {
            name: self.name,
            variants: self.variants,
        }))))
    }
}
