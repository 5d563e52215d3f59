//! Scalar, literal, optional, any and string-constructed transforms

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde_json::Value;

use super::{exact_scalar, literal_of, Loader};
use crate::errors::{Error, LoadResult};
use crate::schema::{ScalarKind, Schema, SpecialKind};
use crate::value::{json_type_name, TypedValue};

/// Loads a value that can only be null.
pub(crate) fn load_null(_l: &Loader, value: &Value, schema: &Arc<Schema>) -> LoadResult<TypedValue> {
    if value.is_null() {
        Ok(TypedValue::Null)
    } else {
        Err(Error::value_error("not null", value, schema.type_name()))
    }
}

/// Loads null or the inner type.
pub(crate) fn load_optional(l: &Loader, value: &Value, schema: &Arc<Schema>) -> LoadResult<TypedValue> {
    let Schema::Optional(inner) = &**schema else {
        return Err(mismatch(value, schema));
    };
    if value.is_null() {
        return Ok(TypedValue::Null);
    }
    l.load_with(value, inner, None)
}

/// Loads a basic scalar: exact runtime matches pass through unchanged,
/// mismatches cast when casting is enabled and raise otherwise.
pub(crate) fn load_scalar(l: &Loader, value: &Value, schema: &Arc<Schema>) -> LoadResult<TypedValue> {
    let Schema::Scalar(kind) = &**schema else {
        return Err(mismatch(value, schema));
    };
    if let Some(v) = exact_scalar(value, *kind) {
        return Ok(v);
    }
    if l.basic_cast {
        cast(value, *kind, &schema.type_name())
    } else {
        Err(Error::value_error(
            format!("not of type {}", kind.type_name()),
            value,
            schema.type_name(),
        ))
    }
}

/// Casts a plain value to a scalar kind. Parse failures are value-kind
/// errors; incompatible input categories are type-kind errors.
fn cast(value: &Value, kind: ScalarKind, type_name: &str) -> LoadResult<TypedValue> {
    match kind {
        ScalarKind::Null => Err(Error::value_error("not null", value, type_name)),
        ScalarKind::Bool => {
            let truthy = match value {
                Value::Null => false,
                Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
                Value::String(s) => !s.is_empty(),
                Value::Array(a) => !a.is_empty(),
                Value::Object(o) => !o.is_empty(),
                Value::Bool(b) => *b,
            };
            Ok(TypedValue::Bool(truthy))
        }
        ScalarKind::Int => match value {
            Value::Bool(b) => Ok(TypedValue::Int(*b as i64)),
            Value::Number(n) => {
                let f = n.as_f64().unwrap_or(f64::NAN);
                // i64::MAX as f64 rounds up to 2^63, which does not fit,
                // so the upper bound must be exclusive
                if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                    Ok(TypedValue::Int(f.trunc() as i64))
                } else {
                    Err(Error::value_error(
                        format!("cannot convert {} to int", n),
                        value,
                        type_name,
                    ))
                }
            }
            Value::String(s) => s.trim().parse::<i64>().map(TypedValue::Int).map_err(|e| {
                Error::value_error(format!("invalid int literal {:?}: {}", s, e), value, type_name)
            }),
            _ => Err(Error::type_error(
                format!("cannot cast {} to int", json_type_name(value)),
                value,
                type_name,
            )),
        },
        ScalarKind::Float => match value {
            Value::Bool(b) => Ok(TypedValue::Float(if *b { 1.0 } else { 0.0 })),
            Value::Number(n) => Ok(TypedValue::Float(n.as_f64().unwrap_or(f64::NAN))),
            Value::String(s) => s.trim().parse::<f64>().map(TypedValue::Float).map_err(|e| {
                Error::value_error(format!("invalid float literal {:?}: {}", s, e), value, type_name)
            }),
            _ => Err(Error::type_error(
                format!("cannot cast {} to float", json_type_name(value)),
                value,
                type_name,
            )),
        },
        ScalarKind::Str => match value {
            Value::Bool(b) => Ok(TypedValue::Str(b.to_string())),
            Value::Number(n) => Ok(TypedValue::Str(n.to_string())),
            Value::Null => Ok(TypedValue::Str("null".to_string())),
            Value::String(s) => Ok(TypedValue::Str(s.clone())),
            _ => Err(Error::type_error(
                format!("cannot cast {} to str", json_type_name(value)),
                value,
                type_name,
            )),
        },
    }
}

/// Loads a member of a finite literal set.
pub(crate) fn load_literal(_l: &Loader, value: &Value, schema: &Arc<Schema>) -> LoadResult<TypedValue> {
    let Schema::Literal(values) = &**schema else {
        return Err(mismatch(value, schema));
    };
    if let Some(lit) = literal_of(value) {
        if values.contains(&lit) {
            return Ok(TypedValue::from_literal(&lit));
        }
    }
    Err(Error::value_error(
        format!("not one of the literal values of {}", schema.type_name()),
        value,
        schema.type_name(),
    ))
}

/// Loads anything, structurally, with no validation.
pub(crate) fn load_any(_l: &Loader, value: &Value, _schema: &Arc<Schema>) -> LoadResult<TypedValue> {
    Ok(TypedValue::from_json(value))
}

/// Loads a string/number-constructed leaf type.
pub(crate) fn load_special(_l: &Loader, value: &Value, schema: &Arc<Schema>) -> LoadResult<TypedValue> {
    let Schema::Special(kind) = &**schema else {
        return Err(mismatch(value, schema));
    };
    let type_name = schema.type_name();
    match kind {
        SpecialKind::Date => match value {
            Value::String(s) => s
                .parse::<NaiveDate>()
                .map(TypedValue::Date)
                .map_err(|e| Error::value_error(e.to_string(), value, &type_name)),
            Value::Array(_) => {
                let p = int_parts(value, 3, 3, &type_name)?;
                NaiveDate::from_ymd_opt(p[0] as i32, p[1] as u32, p[2] as u32)
                    .map(TypedValue::Date)
                    .ok_or_else(|| Error::value_error("date out of range", value, &type_name))
            }
            _ => Err(Error::type_error(
                "expected an ISO date string or [year, month, day]",
                value,
                &type_name,
            )),
        },
        SpecialKind::Time => match value {
            Value::String(s) => s
                .parse::<NaiveTime>()
                .map(TypedValue::Time)
                .map_err(|e| Error::value_error(e.to_string(), value, &type_name)),
            Value::Array(_) => {
                let p = int_parts(value, 3, 4, &type_name)?;
                let micro = p.get(3).copied().unwrap_or(0);
                NaiveTime::from_hms_micro_opt(p[0] as u32, p[1] as u32, p[2] as u32, micro as u32)
                    .map(TypedValue::Time)
                    .ok_or_else(|| Error::value_error("time out of range", value, &type_name))
            }
            _ => Err(Error::type_error(
                "expected an ISO time string or [hour, minute, second, microsecond]",
                value,
                &type_name,
            )),
        },
        SpecialKind::DateTime => match value {
            Value::String(s) => s
                .parse::<NaiveDateTime>()
                .map(TypedValue::DateTime)
                .map_err(|e| Error::value_error(e.to_string(), value, &type_name)),
            Value::Array(_) => {
                let p = int_parts(value, 6, 7, &type_name)?;
                let micro = p.get(6).copied().unwrap_or(0);
                NaiveDate::from_ymd_opt(p[0] as i32, p[1] as u32, p[2] as u32)
                    .and_then(|d| {
                        d.and_hms_micro_opt(p[3] as u32, p[4] as u32, p[5] as u32, micro as u32)
                    })
                    .map(TypedValue::DateTime)
                    .ok_or_else(|| Error::value_error("datetime out of range", value, &type_name))
            }
            _ => Err(Error::type_error(
                "expected an ISO datetime string or a 7-element numeric array",
                value,
                &type_name,
            )),
        },
        SpecialKind::Duration => match value.as_f64() {
            Some(secs) if secs.is_finite() => Ok(TypedValue::Duration(Duration::microseconds(
                (secs * 1_000_000.0).round() as i64,
            ))),
            _ => Err(Error::type_error(
                "expected a duration in seconds",
                value,
                &type_name,
            )),
        },
        SpecialKind::Path => match value {
            Value::String(s) => Ok(TypedValue::Path(PathBuf::from(s))),
            _ => Err(Error::type_error("expected a path string", value, &type_name)),
        },
        SpecialKind::IpAddr => parse_str(value, &type_name, |s| {
            s.parse().map(TypedValue::Ip).map_err(|e| e.to_string())
        }),
        SpecialKind::SocketAddr => parse_str(value, &type_name, |s| {
            s.parse().map(TypedValue::SocketAddr).map_err(|e| e.to_string())
        }),
        SpecialKind::Uuid => parse_str(value, &type_name, |s| {
            s.parse().map(TypedValue::Uuid).map_err(|e| e.to_string())
        }),
        SpecialKind::Pattern => parse_str(value, &type_name, |s| {
            Regex::new(s)
                .map(|_| TypedValue::Pattern(s.to_string()))
                .map_err(|e| e.to_string())
        }),
    }
}

fn parse_str(
    value: &Value,
    type_name: &str,
    parse: impl Fn(&str) -> Result<TypedValue, String>,
) -> LoadResult<TypedValue> {
    match value {
        Value::String(s) => {
            parse(s).map_err(|e| Error::value_error(e, value, type_name))
        }
        _ => Err(Error::type_error(
            format!("expected a string, got {}", json_type_name(value)),
            value,
            type_name,
        )),
    }
}

/// Extracts between `min` and `max` integer elements from a numeric array.
fn int_parts(value: &Value, min: usize, max: usize, type_name: &str) -> LoadResult<Vec<i64>> {
    let items = value
        .as_array()
        .ok_or_else(|| Error::type_error("expected a numeric array", value, type_name))?;
    if items.len() < min || items.len() > max {
        return Err(Error::value_error(
            format!("expected between {} and {} elements, got {}", min, max, items.len()),
            value,
            type_name,
        ));
    }
    items
        .iter()
        .map(|v| {
            v.as_i64().ok_or_else(|| {
                Error::value_error(
                    format!("expected an integer, got {}", json_type_name(v)),
                    value,
                    type_name,
                )
            })
        })
        .collect()
}

fn mismatch(value: &Value, schema: &Schema) -> Error {
    Error::type_error(
        format!("handler does not apply to type {}", schema.type_name()),
        value,
        schema.type_name(),
    )
}
