//! Load/Dump Mirror Tests
//!
//! The dumper mirrors the loader: dumping a loaded value and reloading
//! the result yields the same typed value.
//! 1. Records, defaults and external names
//! 2. Recursive structures
//! 3. Temporal and leaf forms
//! 4. Container shapes

use std::sync::Arc;

use serde_json::json;
use strictload::{dump, load, Dumper, Loader, RecordSchema, Schema, TypedValue};

fn reload(schema: &Arc<Schema>, value: &TypedValue) -> TypedValue {
    let plain = dump(value).unwrap();
    load(&plain, schema).unwrap()
}

// =============================================================================
// RECORDS
// =============================================================================

/// A loaded record dumps back to its wire form and reloads identically.
#[test]
fn test_record_roundtrip() {
    let schema = RecordSchema::builder("Point")
        .field("x", Schema::int())
        .field("y", Schema::int())
        .build()
        .unwrap();
    let v = load(&json!({"x": 1, "y": 2}), &schema).unwrap();
    assert_eq!(dump(&v).unwrap(), json!({"x": 1, "y": 2}));
    assert_eq!(reload(&schema, &v), v);
}

/// Fields equal to their default are omitted by default, kept when
/// `hide_default` is off, and reload to the same record either way.
#[test]
fn test_default_omission() {
    let schema = RecordSchema::builder("Conf")
        .field("host", Schema::str_())
        .optional("port", Schema::int(), TypedValue::Int(8080))
        .build()
        .unwrap();
    let v = load(&json!({"host": "h"}), &schema).unwrap();

    assert_eq!(dump(&v).unwrap(), json!({"host": "h"}));

    let mut full = Dumper::new();
    full.hide_default = false;
    assert_eq!(full.dump(&v).unwrap(), json!({"host": "h", "port": 8080}));

    assert_eq!(reload(&schema, &v), v);
}

/// A non-default value in an optional field survives the roundtrip.
#[test]
fn test_non_default_value_kept() {
    let schema = RecordSchema::builder("Conf")
        .field("host", Schema::str_())
        .optional("port", Schema::int(), TypedValue::Int(8080))
        .build()
        .unwrap();
    let v = load(&json!({"host": "h", "port": 9000}), &schema).unwrap();
    assert_eq!(dump(&v).unwrap(), json!({"host": "h", "port": 9000}));
}

/// External names are used on the way out as well as on the way in.
#[test]
fn test_external_names_roundtrip() {
    let schema = RecordSchema::builder("Row")
        .renamed("type_", "type", Schema::str_())
        .build()
        .unwrap();
    let v = load(&json!({"type": "a"}), &schema).unwrap();
    assert_eq!(dump(&v).unwrap(), json!({"type": "a"}));
    assert_eq!(reload(&schema, &v), v);
}

// =============================================================================
// RECURSIVE STRUCTURES
// =============================================================================

/// A linked structure built through a self-reference dumps and reloads.
#[test]
fn test_recursive_roundtrip() {
    let node = RecordSchema::builder("Node")
        .field("label", Schema::str_())
        .optional(
            "next",
            Schema::optional(Schema::reference("Node")),
            TypedValue::Null,
        )
        .build()
        .unwrap();
    let data = json!({"label": "a", "next": {"label": "b"}});
    let l = Loader::new();
    let v = l.load(&data, &node).unwrap();

    let plain = dump(&v).unwrap();
    // The terminal null next is the default, so it is omitted.
    assert_eq!(plain, json!({"label": "a", "next": {"label": "b"}}));
    assert_eq!(l.load(&plain, &node).unwrap(), v);
}

// =============================================================================
// TEMPORAL AND LEAF FORMS
// =============================================================================

/// Dates dump as numeric arrays by default and as ISO strings on demand;
/// both forms reload to the same value.
#[test]
fn test_date_forms() {
    let schema = Schema::date();
    let v = load(&json!("2024-02-29"), &schema).unwrap();

    assert_eq!(dump(&v).unwrap(), json!([2024, 2, 29]));

    let mut iso = Dumper::new();
    iso.iso_dates = true;
    assert_eq!(iso.dump(&v).unwrap(), json!("2024-02-29"));

    assert_eq!(reload(&schema, &v), v);
}

/// Times and datetimes keep microsecond precision across the roundtrip.
#[test]
fn test_time_precision_roundtrip() {
    let time = Schema::time();
    let t = load(&json!([12, 30, 5, 250]), &time).unwrap();
    assert_eq!(dump(&t).unwrap(), json!([12, 30, 5, 250]));
    assert_eq!(reload(&time, &t), t);

    let datetime = Schema::datetime();
    let dt = load(&json!([2024, 1, 2, 3, 4, 5, 6]), &datetime).unwrap();
    assert_eq!(dump(&dt).unwrap(), json!([2024, 1, 2, 3, 4, 5, 6]));
    assert_eq!(reload(&datetime, &dt), dt);
}

/// Durations dump as seconds and reload to the same microsecond count.
#[test]
fn test_duration_roundtrip() {
    let schema = Schema::duration();
    let v = load(&json!(1.5), &schema).unwrap();
    assert_eq!(dump(&v).unwrap(), json!(1.5));
    assert_eq!(reload(&schema, &v), v);
}

/// String-constructed leaves dump back to their source strings.
#[test]
fn test_leaf_strings_roundtrip() {
    for (schema, wire) in [
        (Schema::ip_addr(), json!("127.0.0.1")),
        (Schema::uuid(), json!("67e55044-10b1-426f-9247-bb680e5fe0c8")),
        (Schema::pattern(), json!("^a+$")),
        (Schema::path(), json!("/tmp/x")),
        (Schema::socket_addr(), json!("127.0.0.1:8080")),
    ] {
        let v = load(&wire, &schema).unwrap();
        assert_eq!(dump(&v).unwrap(), wire);
    }
}

// =============================================================================
// CONTAINERS
// =============================================================================

/// Lists, tuples and maps mirror through dump and load.
#[test]
fn test_container_roundtrip() {
    let list = Schema::list(Schema::int());
    let v = load(&json!([1, 2, 3]), &list).unwrap();
    assert_eq!(dump(&v).unwrap(), json!([1, 2, 3]));

    let tuple = Schema::tuple(vec![Schema::int(), Schema::str_()]);
    let v = load(&json!([1, "a"]), &tuple).unwrap();
    assert_eq!(dump(&v).unwrap(), json!([1, "a"]));

    let map = Schema::map(Schema::str_(), Schema::int());
    let v = load(&json!({"a": 1}), &map).unwrap();
    assert_eq!(dump(&v).unwrap(), json!({"a": 1}));
    assert_eq!(reload(&map, &v), v);
}

/// Integer-keyed maps dump their keys as strings and reload through the
/// key cast.
#[test]
fn test_int_keyed_map_roundtrip() {
    let schema = Schema::map(Schema::int(), Schema::str_());
    let v = load(&json!({"1": "a", "2": "b"}), &schema).unwrap();
    assert_eq!(dump(&v).unwrap(), json!({"1": "a", "2": "b"}));
    assert_eq!(reload(&schema, &v), v);
}

/// Enum values dump as their encoded form.
#[test]
fn test_enum_roundtrip() {
    use strictload::EnumSchema;
    let schema = EnumSchema::builder("Color")
        .variant("Red", 1)
        .variant("Green", 2)
        .build()
        .unwrap();
    let v = load(&json!(2), &schema).unwrap();
    assert_eq!(dump(&v).unwrap(), json!(2));
    assert_eq!(reload(&schema, &v), v);
}
