//! Typed value model
//!
//! The result of a load: a strongly shaped value mirroring the schema
//! tags. Values are totally ordered and hashable (floats through
//! `total_cmp`/`to_bits`) so they can serve as set members and map keys.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use uuid::Uuid;

use crate::schema::{EnumSchema, LiteralValue, RecordSchema, ScalarKind};

/// A loaded, strongly typed value
#[derive(Debug, Clone)]
pub enum TypedValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<TypedValue>),
    Tuple(Vec<TypedValue>),
    /// Produced by both `Set` and `FrozenSet` schemas
    Set(BTreeSet<TypedValue>),
    Map(BTreeMap<TypedValue, TypedValue>),
    Record(RecordValue),
    Enum(EnumValue),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Duration(Duration),
    Path(PathBuf),
    Ip(IpAddr),
    SocketAddr(SocketAddr),
    Uuid(Uuid),
    /// A regex pattern, stored as its validated source
    Pattern(String),
}

impl TypedValue {
    /// Returns the kind name for error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            TypedValue::Null => "null",
            TypedValue::Bool(_) => "bool",
            TypedValue::Int(_) => "int",
            TypedValue::Float(_) => "float",
            TypedValue::Str(_) => "str",
            TypedValue::List(_) => "list",
            TypedValue::Tuple(_) => "tuple",
            TypedValue::Set(_) => "set",
            TypedValue::Map(_) => "map",
            TypedValue::Record(_) => "record",
            TypedValue::Enum(_) => "enum",
            TypedValue::Date(_) => "date",
            TypedValue::Time(_) => "time",
            TypedValue::DateTime(_) => "datetime",
            TypedValue::Duration(_) => "duration",
            TypedValue::Path(_) => "path",
            TypedValue::Ip(_) => "ipaddr",
            TypedValue::SocketAddr(_) => "socketaddr",
            TypedValue::Uuid(_) => "uuid",
            TypedValue::Pattern(_) => "pattern",
        }
    }

    /// The scalar kind of this value, if it is a basic scalar.
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self {
            TypedValue::Null => Some(ScalarKind::Null),
            TypedValue::Bool(_) => Some(ScalarKind::Bool),
            TypedValue::Int(_) => Some(ScalarKind::Int),
            TypedValue::Float(_) => Some(ScalarKind::Float),
            TypedValue::Str(_) => Some(ScalarKind::Str),
            _ => None,
        }
    }

    /// Structural conversion from plain JSON, used by the `Any` loader.
    pub fn from_json(value: &Value) -> TypedValue {
        match value {
            Value::Null => TypedValue::Null,
            Value::Bool(b) => TypedValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    TypedValue::Int(i)
                } else {
                    TypedValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => TypedValue::Str(s.clone()),
            Value::Array(items) => {
                TypedValue::List(items.iter().map(TypedValue::from_json).collect())
            }
            Value::Object(map) => TypedValue::Map(
                map.iter()
                    .map(|(k, v)| (TypedValue::Str(k.clone()), TypedValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Converts a literal member into its value form.
    pub fn from_literal(literal: &LiteralValue) -> TypedValue {
        match literal {
            LiteralValue::Bool(b) => TypedValue::Bool(*b),
            LiteralValue::Int(i) => TypedValue::Int(*i),
            LiteralValue::Str(s) => TypedValue::Str(s.clone()),
        }
    }

    /// The literal form of this value, if it has one.
    pub fn to_literal(&self) -> Option<LiteralValue> {
        match self {
            TypedValue::Bool(b) => Some(LiteralValue::Bool(*b)),
            TypedValue::Int(i) => Some(LiteralValue::Int(*i)),
            TypedValue::Str(s) => Some(LiteralValue::Str(s.clone())),
            _ => None,
        }
    }

    /// Ordering rank of the variant; contents break ties within a rank.
    fn rank(&self) -> u8 {
        match self {
            TypedValue::Null => 0,
            TypedValue::Bool(_) => 1,
            TypedValue::Int(_) => 2,
            TypedValue::Float(_) => 3,
            TypedValue::Str(_) => 4,
            TypedValue::List(_) => 5,
            TypedValue::Tuple(_) => 6,
            TypedValue::Set(_) => 7,
            TypedValue::Map(_) => 8,
            TypedValue::Record(_) => 9,
            TypedValue::Enum(_) => 10,
            TypedValue::Date(_) => 11,
            TypedValue::Time(_) => 12,
            TypedValue::DateTime(_) => 13,
            TypedValue::Duration(_) => 14,
            TypedValue::Path(_) => 15,
            TypedValue::Ip(_) => 16,
            TypedValue::SocketAddr(_) => 17,
            TypedValue::Uuid(_) => 18,
            TypedValue::Pattern(_) => 19,
        }
    }
}

impl Ord for TypedValue {
    fn cmp(&self, other: &Self) -> Ordering {
        use TypedValue::*;
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Int(a), Int(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Str(a), Str(b)) => a.cmp(b),
            (List(a), List(b)) => a.cmp(b),
            (Tuple(a), Tuple(b)) => a.cmp(b),
            (Set(a), Set(b)) => a.cmp(b),
            (Map(a), Map(b)) => a.cmp(b),
            (Record(a), Record(b)) => a.cmp(b),
            (Enum(a), Enum(b)) => a.cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            (Time(a), Time(b)) => a.cmp(b),
            (DateTime(a), DateTime(b)) => a.cmp(b),
            (Duration(a), Duration(b)) => a.cmp(b),
            (Path(a), Path(b)) => a.cmp(b),
            (Ip(a), Ip(b)) => a.cmp(b),
            (SocketAddr(a), SocketAddr(b)) => a.cmp(b),
            (Uuid(a), Uuid(b)) => a.cmp(b),
            (Pattern(a), Pattern(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for TypedValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for TypedValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TypedValue {}

impl Hash for TypedValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            TypedValue::Null => {}
            TypedValue::Bool(b) => b.hash(state),
            TypedValue::Int(i) => i.hash(state),
            TypedValue::Float(f) => f.to_bits().hash(state),
            TypedValue::Str(s) => s.hash(state),
            TypedValue::List(v) | TypedValue::Tuple(v) => v.hash(state),
            TypedValue::Set(s) => s.hash(state),
            TypedValue::Map(m) => m.hash(state),
            TypedValue::Record(r) => r.hash(state),
            TypedValue::Enum(e) => e.hash(state),
            TypedValue::Date(d) => d.hash(state),
            TypedValue::Time(t) => t.hash(state),
            TypedValue::DateTime(dt) => dt.hash(state),
            TypedValue::Duration(d) => {
                d.num_seconds().hash(state);
                d.subsec_nanos().hash(state);
            }
            TypedValue::Path(p) => p.hash(state),
            TypedValue::Ip(ip) => ip.hash(state),
            TypedValue::SocketAddr(a) => a.hash(state),
            TypedValue::Uuid(u) => u.hash(state),
            TypedValue::Pattern(p) => p.hash(state),
        }
    }
}

impl From<i64> for TypedValue {
    fn from(v: i64) -> Self {
        TypedValue::Int(v)
    }
}

impl From<f64> for TypedValue {
    fn from(v: f64) -> Self {
        TypedValue::Float(v)
    }
}

impl From<bool> for TypedValue {
    fn from(v: bool) -> Self {
        TypedValue::Bool(v)
    }
}

impl From<&str> for TypedValue {
    fn from(v: &str) -> Self {
        TypedValue::Str(v.to_string())
    }
}

impl From<String> for TypedValue {
    fn from(v: String) -> Self {
        TypedValue::Str(v)
    }
}

/// A loaded record: its schema plus one value per field, in declaration
/// order, with defaults filled in.
#[derive(Debug, Clone)]
pub struct RecordValue {
    pub schema: Arc<RecordSchema>,
    pub fields: Vec<TypedValue>,
}

impl RecordValue {
    pub fn new(schema: Arc<RecordSchema>, fields: Vec<TypedValue>) -> Self {
        Self { schema, fields }
    }

    /// Returns the value of the named field.
    pub fn get(&self, name: &str) -> Option<&TypedValue> {
        let i = self.schema.index_of(name)?;
        self.fields.get(i)
    }
}

impl Ord for RecordValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.schema
            .name
            .cmp(&other.schema.name)
            .then_with(|| self.fields.cmp(&other.fields))
    }
}

impl PartialOrd for RecordValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for RecordValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RecordValue {}

impl Hash for RecordValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.schema.name.hash(state);
        self.fields.hash(state);
    }
}

/// A loaded enum: its schema plus the resolved variant index
#[derive(Debug, Clone)]
pub struct EnumValue {
    pub schema: Arc<EnumSchema>,
    pub variant: usize,
}

impl EnumValue {
    /// Returns the variant name.
    pub fn name(&self) -> &str {
        &self.schema.variants[self.variant].name
    }

    /// Returns the value the variant is encoded as.
    pub fn value(&self) -> &LiteralValue {
        &self.schema.variants[self.variant].value
    }
}

impl Ord for EnumValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.schema
            .name
            .cmp(&other.schema.name)
            .then_with(|| self.variant.cmp(&other.variant))
    }
}

impl PartialOrd for EnumValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for EnumValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for EnumValue {}

impl Hash for EnumValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.schema.name.hash(state);
        self.variant.hash(state);
    }
}

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                "int"
            } else {
                "float"
            }
        }
        Value::String(_) => "str",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
