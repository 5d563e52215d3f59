//! Record, enum, forward-reference and alias transforms

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use serde_json::Value;

use super::{literal_of, Loader};
use crate::errors::{Annotation, Error, LoadResult};
use crate::schema::{RecordSchema, Schema};
use crate::value::{json_type_name, EnumValue, RecordValue, TypedValue};

/// Precomputed per-record loading data, cached on schema identity.
pub(crate) struct RecordPlan {
    /// External name of each field, in declaration order
    pub wire_names: Vec<String>,
    /// External name -> field position
    pub wire_to_index: HashMap<String, usize>,
    /// Positions of fields without defaults
    pub required: Vec<usize>,
}

impl Loader {
    /// Returns the cached plan for a record schema, building it on first use.
    pub(crate) fn plan(&self, rec: &Arc<RecordSchema>) -> Rc<RecordPlan> {
        let key = Arc::as_ptr(rec) as usize;
        if let Some(plan) = self.plans.borrow().get(&key) {
            return Rc::clone(plan);
        }
        let wire_names: Vec<String> = rec
            .fields
            .iter()
            .map(|f| f.external_name(&self.mangle_key).to_string())
            .collect();
        let wire_to_index = wire_names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        let required = rec
            .fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.default.is_required())
            .map(|(i, _)| i)
            .collect();
        let plan = Rc::new(RecordPlan {
            wire_names,
            wire_to_index,
            required,
        });
        self.plans.borrow_mut().insert(key, Rc::clone(&plan));
        plan
    }
}

/// Loads an object into a record, filling defaults for absent fields.
pub(crate) fn load_record(l: &Loader, value: &Value, schema: &Arc<Schema>) -> LoadResult<TypedValue> {
    let Schema::Record(rec) = &**schema else {
        return Err(mismatch(value, schema));
    };
    let obj = value.as_object().ok_or_else(|| {
        Error::attribute_error(
            format!("expected an object, got {}", json_type_name(value)),
            value,
            schema.type_name(),
        )
    })?;
    let plan = l.plan(rec);

    let missing: Vec<&str> = plan
        .required
        .iter()
        .filter(|&&i| !obj.contains_key(&plan.wire_names[i]))
        .map(|&i| rec.fields[i].name.as_str())
        .collect();
    if !missing.is_empty() {
        return Err(Error::value_error(
            format!(
                "value does not contain fields: {} which are necessary for type {}",
                missing.join(", "),
                rec.name
            ),
            value,
            schema.type_name(),
        ));
    }

    if l.fail_on_extra {
        let extra: Vec<&str> = obj
            .keys()
            .filter(|k| !plan.wire_to_index.contains_key(k.as_str()))
            .map(String::as_str)
            .collect();
        if !extra.is_empty() {
            return Err(Error::value_error(
                format!("undeclared fields: {}", extra.join(", ")),
                value,
                schema.type_name(),
            ));
        }
    }

    let mut fields = Vec::with_capacity(rec.fields.len());
    for (i, fd) in rec.fields.iter().enumerate() {
        match obj.get(&plan.wire_names[i]) {
            Some(raw) => {
                fields.push(l.load_with(raw, &fd.schema, Some(Annotation::field(&fd.name)))?);
            }
            None => match fd.default.produce() {
                Some(v) => fields.push(v),
                None => {
                    // Required fields were checked above
                    return Err(Error::value_error(
                        format!("missing required field {}", fd.name),
                        value,
                        schema.type_name(),
                    ));
                }
            },
        }
    }
    Ok(TypedValue::Record(RecordValue::new(Arc::clone(rec), fields)))
}

/// Loads an enum variant: direct value match first, then each variant's
/// value-type hint as a casting fallback.
pub(crate) fn load_enum(l: &Loader, value: &Value, schema: &Arc<Schema>) -> LoadResult<TypedValue> {
    let Schema::Enum(e) = &**schema else {
        return Err(mismatch(value, schema));
    };
    if let Some(lit) = literal_of(value) {
        if let Some(i) = e.variant_by_value(&lit) {
            return Ok(TypedValue::Enum(EnumValue {
                schema: Arc::clone(e),
                variant: i,
            }));
        }
    }

    let mut causes = Vec::new();
    for (i, variant) in e.variants.iter().enumerate() {
        let Some(hint) = &variant.hint else { continue };
        match l.load(value, hint) {
            Ok(loaded) => {
                if loaded.to_literal().as_ref() == Some(&variant.value) {
                    return Ok(TypedValue::Enum(EnumValue {
                        schema: Arc::clone(e),
                        variant: i,
                    }));
                }
            }
            Err(err) => causes.push(err),
        }
    }

    let description = if e.variants.len() <= 10 {
        format!(
            "not a valid value for enum {}; allowed values: {}",
            e.name,
            e.allowed_values()
        )
    } else {
        format!("not a valid value for enum {}", e.name)
    };
    Err(Error::value_error(description, value, schema.type_name()).with_causes(causes))
}

/// Resolves a forward reference through the name table and loads against
/// the resolved type.
pub(crate) fn load_ref(l: &Loader, value: &Value, schema: &Arc<Schema>) -> LoadResult<TypedValue> {
    let Schema::Ref(name) = &**schema else {
        return Err(mismatch(value, schema));
    };
    if !l.refs_enabled() {
        return Err(Error::type_error(
            "forward references are disabled",
            value,
            schema.type_name(),
        ));
    }
    let target = l.resolve_ref(name).ok_or_else(|| {
        Error::value_error(
            format!("forward reference {:?} unknown", name),
            value,
            schema.type_name(),
        )
    })?;
    l.load_with(value, &target, Some(Annotation::forward_ref(name.clone())))
}

/// Unwraps a named alias to its underlying type.
pub(crate) fn load_alias(l: &Loader, value: &Value, schema: &Arc<Schema>) -> LoadResult<TypedValue> {
    let Schema::Alias(_, inner) = &**schema else {
        return Err(mismatch(value, schema));
    };
    l.load_with(value, inner, None)
}

fn mismatch(value: &Value, schema: &Schema) -> Error {
    Error::type_error(
        format!("handler does not apply to type {}", schema.type_name()),
        value,
        schema.type_name(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::EnumSchema;
    use serde_json::json;

    fn point() -> Arc<Schema> {
        RecordSchema::builder("Point")
            .field("x", Schema::int())
            .field("y", Schema::int())
            .build()
            .unwrap()
    }

    #[test]
    fn test_record_loads_fields_in_order() {
        let l = Loader::new();
        let v = l.load(&json!({"x": 1, "y": 2}), &point()).unwrap();
        let TypedValue::Record(r) = v else { panic!("expected record") };
        assert_eq!(r.fields, vec![TypedValue::Int(1), TypedValue::Int(2)]);
        assert_eq!(r.get("y"), Some(&TypedValue::Int(2)));
    }

    #[test]
    fn test_record_missing_required_names_fields() {
        let l = Loader::new();
        let err = l.load(&json!({"x": 1}), &point()).unwrap_err();
        assert!(err.description().contains("y"));
        assert!(err.description().contains("Point"));
    }

    #[test]
    fn test_record_extras_dropped_unless_strict() {
        let mut l = Loader::new();
        assert!(l.load(&json!({"x": 1, "y": 2, "z": 3}), &point()).is_ok());
        l.fail_on_extra = true;
        let err = l.load(&json!({"x": 1, "y": 2, "z": 3}), &point()).unwrap_err();
        assert!(err.description().contains("z"));
    }

    #[test]
    fn test_record_defaults_fill_absent_fields() {
        let l = Loader::new();
        let schema = RecordSchema::builder("Conf")
            .field("host", Schema::str_())
            .optional("port", Schema::int(), TypedValue::Int(8080))
            .build()
            .unwrap();
        let v = l.load(&json!({"host": "localhost"}), &schema).unwrap();
        let TypedValue::Record(r) = v else { panic!("expected record") };
        assert_eq!(r.get("port"), Some(&TypedValue::Int(8080)));
    }

    #[test]
    fn test_record_external_names() {
        let l = Loader::new();
        let schema = RecordSchema::builder("Row")
            .renamed("type_", "type", Schema::str_())
            .build()
            .unwrap();
        let v = l.load(&json!({"type": "a"}), &schema).unwrap();
        let TypedValue::Record(r) = v else { panic!("expected record") };
        assert_eq!(r.get("type_"), Some(&TypedValue::from("a")));
    }

    #[test]
    fn test_record_field_failure_annotates_internal_name() {
        let l = Loader::new();
        let err = l.load(&json!({"x": 1, "y": "zz"}), &point()).unwrap_err();
        assert_eq!(err.path(), ".y");
    }

    #[test]
    fn test_record_non_object_is_attribute_kind() {
        use crate::errors::ErrorKind;
        let mut l = Loader::new();
        l.dict_equivalence = false;
        let err = l.load(&json!(42), &point()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Attribute);
    }

    #[test]
    fn test_enum_direct_value_match() {
        let l = Loader::new();
        let schema = EnumSchema::builder("Color")
            .variant("Red", 1)
            .variant("Green", 2)
            .build()
            .unwrap();
        let v = l.load(&json!(2), &schema).unwrap();
        let TypedValue::Enum(e) = v else { panic!("expected enum") };
        assert_eq!(e.name(), "Green");
    }

    #[test]
    fn test_enum_hint_fallback_casts() {
        let l = Loader::new();
        let schema = EnumSchema::builder("Color")
            .variant_with_hint("Red", 1, Schema::int())
            .variant_with_hint("Green", 2, Schema::int())
            .build()
            .unwrap();
        let v = l.load(&json!("2"), &schema).unwrap();
        let TypedValue::Enum(e) = v else { panic!("expected enum") };
        assert_eq!(e.name(), "Green");
    }

    #[test]
    fn test_enum_error_lists_allowed_values() {
        let l = Loader::new();
        let schema = EnumSchema::builder("Color")
            .variant("Red", 1)
            .variant("Green", 2)
            .build()
            .unwrap();
        let err = l.load(&json!(9), &schema).unwrap_err();
        assert!(err.description().contains("allowed values"));
    }

    #[test]
    fn test_forward_ref_resolves_registered_name() {
        let l = Loader::new();
        let schema = point();
        l.register_ref("Point", Arc::clone(&schema));
        let v = l
            .load(&json!({"x": 1, "y": 2}), &Schema::reference("Point"))
            .unwrap();
        assert!(matches!(v, TypedValue::Record(_)));
    }

    #[test]
    fn test_forward_ref_unknown_name() {
        let l = Loader::new();
        assert!(l.load(&json!(1), &Schema::reference("Ghost")).is_err());
    }

    #[test]
    fn test_forward_ref_disabled() {
        let mut l = Loader::new();
        l.disable_refs();
        l.register_ref("Point", point());
        assert!(l.load(&json!({"x": 1, "y": 2}), &Schema::reference("Point")).is_err());
    }

    #[test]
    fn test_recursive_type_through_self_reference() {
        let l = Loader::new();
        let node = RecordSchema::builder("Node")
            .field("label", Schema::str_())
            .optional(
                "next",
                Schema::optional(Schema::reference("Node")),
                TypedValue::Null,
            )
            .build()
            .unwrap();
        let v = l
            .load(&json!({"label": "a", "next": {"label": "b"}}), &node)
            .unwrap();
        let TypedValue::Record(r) = v else { panic!("expected record") };
        assert!(matches!(r.get("next"), Some(TypedValue::Record(_))));
    }

    #[test]
    fn test_alias_unwraps() {
        let l = Loader::new();
        let schema = Schema::alias("UserId", Schema::int());
        assert_eq!(l.load(&json!(7), &schema).unwrap(), TypedValue::Int(7));
    }

    #[test]
    fn test_plan_cached_per_record() {
        let l = Loader::new();
        let schema = point();
        l.load(&json!({"x": 1, "y": 2}), &schema).unwrap();
        l.load(&json!({"x": 3, "y": 4}), &schema).unwrap();
        assert_eq!(l.plans.borrow().len(), 1);
    }
}
