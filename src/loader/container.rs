//! Sequence, tuple, set and map transforms

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde_json::Value;

use super::{exact_scalar, Loader};
use crate::errors::{Annotation, Error, LoadResult};
use crate::schema::Schema;
use crate::value::{json_type_name, TypedValue};

/// Loads a homogeneous list.
pub(crate) fn load_list(l: &Loader, value: &Value, schema: &Arc<Schema>) -> LoadResult<TypedValue> {
    let Schema::List(element) = &**schema else {
        return Err(mismatch(value, schema));
    };
    Ok(TypedValue::List(load_elements(l, value, element, schema)?))
}

/// Loads a variadic tuple; same shape as a list, different typed form.
pub(crate) fn load_variadic(l: &Loader, value: &Value, schema: &Arc<Schema>) -> LoadResult<TypedValue> {
    let Schema::Variadic(element) = &**schema else {
        return Err(mismatch(value, schema));
    };
    Ok(TypedValue::Tuple(load_elements(l, value, element, schema)?))
}

/// Loads a set or frozen set; duplicates collapse.
pub(crate) fn load_set(l: &Loader, value: &Value, schema: &Arc<Schema>) -> LoadResult<TypedValue> {
    let (Schema::Set(element) | Schema::FrozenSet(element)) = &**schema else {
        return Err(mismatch(value, schema));
    };
    let elements = load_elements(l, value, element, schema)?;
    Ok(TypedValue::Set(elements.into_iter().collect::<BTreeSet<_>>()))
}

/// Shared element loop for homogeneous sequences.
///
/// When the element type is a basic scalar, exact matches bypass the
/// recursive dispatch; the first mismatch falls back to the slow path for
/// that element onward so casts and errors behave identically.
fn load_elements(
    l: &Loader,
    value: &Value,
    element: &Arc<Schema>,
    schema: &Arc<Schema>,
) -> LoadResult<Vec<TypedValue>> {
    let items = value.as_array().ok_or_else(|| {
        Error::type_error(
            format!("expected an array, got {}", json_type_name(value)),
            value,
            schema.type_name(),
        )
    })?;

    let fast = matches!(&**element, Schema::Scalar(k) if l.basic_types.contains(k));

    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        if fast {
            if let Schema::Scalar(k) = &**element {
                if let Some(v) = exact_scalar(item, *k) {
                    out.push(v);
                    continue;
                }
            }
        }
        out.push(l.load_with(item, element, Some(Annotation::index(i)))?);
    }
    Ok(out)
}

/// Loads a fixed-arity tuple.
///
/// Too few elements is always an error; extra elements are dropped unless
/// `fail_on_extra` is set.
pub(crate) fn load_tuple(l: &Loader, value: &Value, schema: &Arc<Schema>) -> LoadResult<TypedValue> {
    let Schema::Tuple(types) = &**schema else {
        return Err(mismatch(value, schema));
    };
    let items = value.as_array().ok_or_else(|| {
        Error::type_error(
            format!("expected an array, got {}", json_type_name(value)),
            value,
            schema.type_name(),
        )
    })?;
    if items.len() < types.len() {
        return Err(Error::value_error(
            format!("expected {} elements, got {}", types.len(), items.len()),
            value,
            schema.type_name(),
        ));
    }
    if l.fail_on_extra && items.len() > types.len() {
        return Err(Error::value_error(
            format!("too many elements: expected {}, got {}", types.len(), items.len()),
            value,
            schema.type_name(),
        ));
    }
    let mut out = Vec::with_capacity(types.len());
    for (i, (item, t)) in items.iter().zip(types.iter()).enumerate() {
        out.push(l.load_with(item, t, Some(Annotation::index(i)))?);
    }
    Ok(TypedValue::Tuple(out))
}

/// Loads a mapping with typed keys and values.
pub(crate) fn load_map(l: &Loader, value: &Value, schema: &Arc<Schema>) -> LoadResult<TypedValue> {
    let Schema::Map(key_type, value_type) = &**schema else {
        return Err(mismatch(value, schema));
    };
    let obj = value.as_object().ok_or_else(|| {
        Error::attribute_error(
            format!("expected an object, got {}", json_type_name(value)),
            value,
            schema.type_name(),
        )
    })?;
    let mut out = BTreeMap::new();
    for (k, v) in obj {
        let wire_key = Value::String(k.clone());
        let typed_key = l.load_with(&wire_key, key_type, Some(Annotation::key(k.clone())))?;
        let typed_value = l.load_with(v, value_type, Some(Annotation::value(k.clone())))?;
        out.insert(typed_key, typed_value);
    }
    Ok(TypedValue::Map(out))
}

fn mismatch(value: &Value, schema: &Schema) -> Error {
    Error::type_error(
        format!("handler does not apply to type {}", schema.type_name()),
        value,
        schema.type_name(),
    )
}
