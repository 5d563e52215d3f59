//! Typed-to-plain dumper, mirroring the loader
//!
//! Same registry architecture as the loader: an ordered list of
//! (condition, transform) entries, first match wins, resolution memoized
//! per value shape. Dumping a loaded value and reloading it yields the
//! same typed value.

use std::cell::RefCell;
use std::collections::HashMap;
use std::mem::Discriminant;
use std::rc::Rc;
use std::sync::Arc;

use chrono::{Datelike, Timelike};
use serde_json::{Map, Value};

use crate::errors::{Error, LoadResult};
use crate::value::TypedValue;

/// Condition deciding whether a handler applies to a typed value
pub type DumpConditionFn = dyn Fn(&Dumper, &TypedValue) -> LoadResult<bool>;

/// Transform turning a typed value back into a plain one
pub type DumpTransformFn = dyn Fn(&Dumper, &TypedValue) -> LoadResult<Value>;

/// One registry entry: a condition and the transform it guards
#[derive(Clone)]
pub struct DumpEntry {
    pub condition: Rc<DumpConditionFn>,
    pub transform: Rc<DumpTransformFn>,
}

impl DumpEntry {
    pub fn new(
        condition: impl Fn(&Dumper, &TypedValue) -> LoadResult<bool> + 'static,
        transform: impl Fn(&Dumper, &TypedValue) -> LoadResult<Value> + 'static,
    ) -> Self {
        Self {
            condition: Rc::new(condition),
            transform: Rc::new(transform),
        }
    }
}

/// Memoization key: variant shape, refined by schema identity for records
/// and enums so per-type resolution stays exact.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum DumpKey {
    Plain(Discriminant<TypedValue>),
    Record(usize),
    Enum(usize),
}

fn dump_key(value: &TypedValue) -> DumpKey {
    match value {
        TypedValue::Record(r) => DumpKey::Record(Arc::as_ptr(&r.schema) as usize),
        TypedValue::Enum(e) => DumpKey::Enum(Arc::as_ptr(&e.schema) as usize),
        other => DumpKey::Plain(std::mem::discriminant(other)),
    }
}

/// A dumper object that turns typed values back into plain ones.
///
/// - `hide_default`: omit record fields equal to their declared default.
/// - `iso_dates`: dump dates and times as ISO strings instead of numeric
///   arrays.
/// - `raise_condition_errors`: when disabled, a failing handler condition
///   counts as a non-match instead of propagating.
/// - `mangle_key`: metadata key selecting the external field name.
/// - `handlers`: the ordered registry, the extension point for custom
///   shapes.
pub struct Dumper {
    pub hide_default: bool,
    pub iso_dates: bool,
    pub raise_condition_errors: bool,
    pub mangle_key: String,
    pub handlers: Vec<DumpEntry>,
    cache: RefCell<HashMap<DumpKey, usize>>,
}

impl Dumper {
    /// Creates a dumper with the default configuration and handler set.
    pub fn new() -> Self {
        Self {
            hide_default: true,
            iso_dates: false,
            raise_condition_errors: true,
            mangle_key: "name".to_string(),
            handlers: Self::default_handlers(),
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// The builtin registry, in priority order.
    fn default_handlers() -> Vec<DumpEntry> {
        vec![
            DumpEntry::new(
                |_, v| {
                    Ok(matches!(
                        v,
                        TypedValue::Null
                            | TypedValue::Bool(_)
                            | TypedValue::Int(_)
                            | TypedValue::Float(_)
                            | TypedValue::Str(_)
                    ))
                },
                dump_scalar,
            ),
            DumpEntry::new(|_, v| Ok(matches!(v, TypedValue::Record(_))), dump_record),
            DumpEntry::new(|_, v| Ok(matches!(v, TypedValue::Enum(_))), dump_enum),
            DumpEntry::new(
                |_, v| {
                    Ok(matches!(
                        v,
                        TypedValue::List(_) | TypedValue::Tuple(_) | TypedValue::Set(_)
                    ))
                },
                dump_sequence,
            ),
            DumpEntry::new(|_, v| Ok(matches!(v, TypedValue::Map(_))), dump_map),
            DumpEntry::new(
                |_, v| {
                    Ok(matches!(
                        v,
                        TypedValue::Date(_) | TypedValue::Time(_) | TypedValue::DateTime(_)
                    ))
                },
                dump_temporal,
            ),
            DumpEntry::new(|_, v| Ok(matches!(v, TypedValue::Duration(_))), dump_duration),
            DumpEntry::new(
                |_, v| {
                    Ok(matches!(
                        v,
                        TypedValue::Path(_)
                            | TypedValue::Ip(_)
                            | TypedValue::SocketAddr(_)
                            | TypedValue::Uuid(_)
                            | TypedValue::Pattern(_)
                    ))
                },
                dump_stringy,
            ),
        ]
    }

    /// Returns the index of the first handler whose condition matches.
    pub fn index(&self, value: &TypedValue) -> LoadResult<usize> {
        for (i, entry) in self.handlers.iter().enumerate() {
            let matched = match (entry.condition)(self, value) {
                Ok(m) => m,
                Err(e) => {
                    if self.raise_condition_errors {
                        return Err(e);
                    }
                    false
                }
            };
            if matched {
                return Ok(i);
            }
        }
        Err(Error::value_error(
            format!("unable to dump value of kind {}", value.kind_name()),
            &Value::Null,
            value.kind_name(),
        ))
    }

    /// Dumps a typed value back into a plain one.
    pub fn dump(&self, value: &TypedValue) -> LoadResult<Value> {
        let key = dump_key(value);
        let cached = self.cache.borrow().get(&key).copied();
        let index = match cached {
            Some(i) => i,
            None => {
                let i = self.index(value)?;
                self.cache.borrow_mut().insert(key, i);
                i
            }
        };
        let transform = Rc::clone(&self.handlers[index].transform);
        transform(self, value)
    }
}

impl Default for Dumper {
    fn default() -> Self {
        Self::new()
    }
}

fn dump_scalar(_d: &Dumper, value: &TypedValue) -> LoadResult<Value> {
    match value {
        TypedValue::Null => Ok(Value::Null),
        TypedValue::Bool(b) => Ok(Value::Bool(*b)),
        TypedValue::Int(i) => Ok(Value::from(*i)),
        TypedValue::Float(f) => float_value(*f, value),
        TypedValue::Str(s) => Ok(Value::String(s.clone())),
        other => Err(wrong_shape(other)),
    }
}

fn float_value(f: f64, value: &TypedValue) -> LoadResult<Value> {
    serde_json::Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| {
            Error::value_error(
                "non-finite float has no plain representation",
                &Value::Null,
                value.kind_name(),
            )
        })
}

/// Dumps a record to an object under external field names, omitting
/// fields equal to their declared default when `hide_default` is on.
fn dump_record(d: &Dumper, value: &TypedValue) -> LoadResult<Value> {
    let TypedValue::Record(rec) = value else {
        return Err(wrong_shape(value));
    };
    let mut out = Map::with_capacity(rec.fields.len());
    for (fd, field) in rec.schema.fields.iter().zip(rec.fields.iter()) {
        if d.hide_default {
            if let Some(default) = fd.default.produce() {
                if &default == field {
                    continue;
                }
            }
        }
        let name = fd.external_name(&d.mangle_key);
        out.insert(name.to_string(), d.dump(field)?);
    }
    Ok(Value::Object(out))
}

/// Dumps an enum as its encoded variant value.
fn dump_enum(d: &Dumper, value: &TypedValue) -> LoadResult<Value> {
    let TypedValue::Enum(e) = value else {
        return Err(wrong_shape(value));
    };
    d.dump(&TypedValue::from_literal(e.value()))
}

fn dump_sequence(d: &Dumper, value: &TypedValue) -> LoadResult<Value> {
    let items: Vec<&TypedValue> = match value {
        TypedValue::List(v) | TypedValue::Tuple(v) => v.iter().collect(),
        TypedValue::Set(s) => s.iter().collect(),
        other => return Err(wrong_shape(other)),
    };
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        out.push(d.dump(item)?);
    }
    Ok(Value::Array(out))
}

/// Dumps a map to an object. Keys that dump to strings are used as is;
/// anything else is stringified.
fn dump_map(d: &Dumper, value: &TypedValue) -> LoadResult<Value> {
    let TypedValue::Map(m) = value else {
        return Err(wrong_shape(value));
    };
    let mut out = Map::with_capacity(m.len());
    for (k, v) in m {
        let key = match d.dump(k)? {
            Value::String(s) => s,
            other => other.to_string(),
        };
        out.insert(key, d.dump(v)?);
    }
    Ok(Value::Object(out))
}

/// Dumps dates and times: numeric arrays by default, ISO strings when
/// `iso_dates` is set.
fn dump_temporal(d: &Dumper, value: &TypedValue) -> LoadResult<Value> {
    match value {
        TypedValue::Date(date) => {
            if d.iso_dates {
                Ok(Value::String(date.to_string()))
            } else {
                Ok(Value::from(vec![
                    date.year() as i64,
                    date.month() as i64,
                    date.day() as i64,
                ]))
            }
        }
        TypedValue::Time(time) => {
            if d.iso_dates {
                Ok(Value::String(time.format("%H:%M:%S%.f").to_string()))
            } else {
                Ok(Value::from(vec![
                    time.hour() as i64,
                    time.minute() as i64,
                    time.second() as i64,
                    (time.nanosecond() / 1000) as i64,
                ]))
            }
        }
        TypedValue::DateTime(dt) => {
            if d.iso_dates {
                Ok(Value::String(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
            } else {
                Ok(Value::from(vec![
                    dt.year() as i64,
                    dt.month() as i64,
                    dt.day() as i64,
                    dt.hour() as i64,
                    dt.minute() as i64,
                    dt.second() as i64,
                    (dt.nanosecond() / 1000) as i64,
                ]))
            }
        }
        other => Err(wrong_shape(other)),
    }
}

/// Dumps a duration as total seconds.
fn dump_duration(_d: &Dumper, value: &TypedValue) -> LoadResult<Value> {
    let TypedValue::Duration(dur) = value else {
        return Err(wrong_shape(value));
    };
    let seconds = match dur.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => dur.num_seconds() as f64,
    };
    float_value(seconds, value)
}

fn dump_stringy(_d: &Dumper, value: &TypedValue) -> LoadResult<Value> {
    let s = match value {
        TypedValue::Path(p) => p.to_string_lossy().into_owned(),
        TypedValue::Ip(ip) => ip.to_string(),
        TypedValue::SocketAddr(a) => a.to_string(),
        TypedValue::Uuid(u) => u.to_string(),
        TypedValue::Pattern(p) => p.clone(),
        other => return Err(wrong_shape(other)),
    };
    Ok(Value::String(s))
}

fn wrong_shape(value: &TypedValue) -> Error {
    Error::value_error(
        format!("handler does not apply to kind {}", value.kind_name()),
        &Value::Null,
        value.kind_name(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RecordSchema, Schema};
    use crate::value::RecordValue;
    use serde_json::json;

    #[test]
    fn test_scalars_dump_identically() {
        let d = Dumper::new();
        assert_eq!(d.dump(&TypedValue::Int(3)).unwrap(), json!(3));
        assert_eq!(d.dump(&TypedValue::from("x")).unwrap(), json!("x"));
        assert_eq!(d.dump(&TypedValue::Null).unwrap(), json!(null));
    }

    #[test]
    fn test_record_omits_defaults() {
        let schema = RecordSchema::builder("Conf")
            .field("host", Schema::str_())
            .optional("port", Schema::int(), TypedValue::Int(8080))
            .build()
            .unwrap();
        let Schema::Record(rec) = &*schema else { panic!("expected record") };
        let value = TypedValue::Record(RecordValue::new(
            Arc::clone(rec),
            vec![TypedValue::from("localhost"), TypedValue::Int(8080)],
        ));

        let d = Dumper::new();
        assert_eq!(d.dump(&value).unwrap(), json!({"host": "localhost"}));

        let mut full = Dumper::new();
        full.hide_default = false;
        assert_eq!(
            full.dump(&value).unwrap(),
            json!({"host": "localhost", "port": 8080})
        );
    }

    #[test]
    fn test_record_uses_external_names() {
        let schema = RecordSchema::builder("Row")
            .renamed("type_", "type", Schema::str_())
            .build()
            .unwrap();
        let Schema::Record(rec) = &*schema else { panic!("expected record") };
        let value = TypedValue::Record(RecordValue::new(
            Arc::clone(rec),
            vec![TypedValue::from("a")],
        ));
        let d = Dumper::new();
        assert_eq!(d.dump(&value).unwrap(), json!({"type": "a"}));
    }

    #[test]
    fn test_map_stringifies_non_string_keys() {
        let d = Dumper::new();
        let m = [(TypedValue::Int(1), TypedValue::from("a"))]
            .into_iter()
            .collect();
        assert_eq!(d.dump(&TypedValue::Map(m)).unwrap(), json!({"1": "a"}));
    }

    #[test]
    fn test_temporal_numeric_and_iso_forms() {
        use chrono::NaiveDate;
        let date = TypedValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        let d = Dumper::new();
        assert_eq!(d.dump(&date).unwrap(), json!([2024, 2, 29]));

        let mut iso = Dumper::new();
        iso.iso_dates = true;
        assert_eq!(iso.dump(&date).unwrap(), json!("2024-02-29"));
    }

    #[test]
    fn test_duration_dumps_as_seconds() {
        let d = Dumper::new();
        let dur = TypedValue::Duration(chrono::Duration::microseconds(1_500_000));
        assert_eq!(d.dump(&dur).unwrap(), json!(1.5));
    }

    #[test]
    fn test_non_finite_float_rejected() {
        let d = Dumper::new();
        assert!(d.dump(&TypedValue::Float(f64::NAN)).is_err());
    }

    #[test]
    fn test_resolution_cached_per_shape() {
        let d = Dumper::new();
        d.dump(&TypedValue::Int(1)).unwrap();
        d.dump(&TypedValue::Int(2)).unwrap();
        assert_eq!(d.cache.borrow().len(), 1);
    }
}
