//! Union Resolution Tests
//!
//! Determinism and ordering of union member selection:
//! 1. Exact scalar passthrough
//! 2. Declaration-order independence
//! 3. Structured members before scalar members
//! 4. Discriminator promotion for tagged record unions
//! 5. Failure aggregation and the debug-conflict mode

use std::sync::Arc;

use serde_json::json;
use strictload::{load, AnnotationKind, Loader, RecordSchema, Schema, TypedValue};

// =============================================================================
// PASSTHROUGH AND ORDERING
// =============================================================================

/// An exact scalar match wins regardless of where the member sits in the
/// declaration.
#[test]
fn test_exact_scalar_passthrough() {
    let a = Schema::union(vec![Schema::int(), Schema::str_()]);
    let b = Schema::union(vec![Schema::str_(), Schema::int()]);
    assert_eq!(load(&json!(3), &a).unwrap(), TypedValue::Int(3));
    assert_eq!(load(&json!(3), &b).unwrap(), TypedValue::Int(3));
    assert_eq!(load(&json!("3"), &a).unwrap(), TypedValue::from("3"));
    assert_eq!(load(&json!("3"), &b).unwrap(), TypedValue::from("3"));
}

/// Exact matches never cast, even with casting enabled, so an int input
/// stays an int when both int and float are members.
#[test]
fn test_no_cast_when_exact_member_exists() {
    let schema = Schema::union(vec![Schema::float(), Schema::int()]);
    assert_eq!(load(&json!(3), &schema).unwrap(), TypedValue::Int(3));
    assert_eq!(load(&json!(3.5), &schema).unwrap(), TypedValue::Float(3.5));
}

/// Null prefers an optional member.
#[test]
fn test_null_prefers_optional_member() {
    let schema = Schema::union(vec![Schema::optional(Schema::int()), Schema::str_()]);
    assert_eq!(load(&json!(null), &schema).unwrap(), TypedValue::Null);
}

/// A structured input tries structured members before any scalar cast
/// can swallow it.
#[test]
fn test_structured_before_scalar() {
    let schema = Schema::union(vec![Schema::str_(), Schema::list(Schema::int())]);
    assert_eq!(
        load(&json!([1, 2]), &schema).unwrap(),
        TypedValue::List(vec![TypedValue::Int(1), TypedValue::Int(2)])
    );
}

// =============================================================================
// DISCRIMINATORS
// =============================================================================

fn animal_union() -> Arc<Schema> {
    let dog = RecordSchema::builder("Dog")
        .field("kind", Schema::literal(vec!["dog".into()]))
        .field("barks", Schema::bool_())
        .build()
        .unwrap();
    let cat = RecordSchema::builder("Cat")
        .field("kind", Schema::literal(vec!["cat".into()]))
        .field("lives", Schema::int())
        .build()
        .unwrap();
    Schema::union(vec![dog, cat])
}

/// A tagged union resolves directly to the member the tag names.
#[test]
fn test_tagged_union_resolution() {
    let schema = animal_union();
    let v = load(&json!({"kind": "cat", "lives": 9}), &schema).unwrap();
    let TypedValue::Record(r) = v else { panic!("expected record") };
    assert_eq!(r.schema.name, "Cat");

    let v = load(&json!({"kind": "dog", "barks": true}), &schema).unwrap();
    let TypedValue::Record(r) = v else { panic!("expected record") };
    assert_eq!(r.schema.name, "Dog");
}

/// A tag naming one member does not stop the others from being tried
/// when that member rejects the value.
#[test]
fn test_tag_promotion_is_not_exclusive() {
    let schema = animal_union();
    // Tag says cat but the body is a dog; the dog member still loads.
    let err = load(&json!({"kind": "cat", "barks": true}), &schema).unwrap_err();
    // Both members fail here: Cat lacks lives, Dog's tag mismatches.
    assert_eq!(err.causes.len(), 2);
}

/// An unknown tag value falls back to trying every member.
#[test]
fn test_unknown_tag_falls_back() {
    let schema = animal_union();
    let err = load(&json!({"kind": "fox"}), &schema).unwrap_err();
    assert_eq!(err.causes.len(), 2);
}

// =============================================================================
// FAILURES
// =============================================================================

/// When nothing matches, the error aggregates one cause per member, each
/// carrying a union annotation in its trace.
#[test]
fn test_failure_aggregation() {
    let schema = Schema::union(vec![
        Schema::list(Schema::int()),
        Schema::map(Schema::str_(), Schema::int()),
    ]);
    let err = load(&json!(true), &schema).unwrap_err();
    assert_eq!(err.causes.len(), 2);
    for cause in &err.causes {
        let annotation = cause.trace[0].annotation.as_ref().unwrap();
        assert_eq!(annotation.kind, AnnotationKind::Union);
    }
}

/// Debug-conflict mode loads unambiguous values and reports when more
/// than one member accepts.
#[test]
fn test_debug_conflict_mode() {
    let mut l = Loader::new();
    l.union_debug_conflict = true;

    let unambiguous = Schema::union(vec![Schema::list(Schema::int()), Schema::int()]);
    assert!(l.load(&json!([1, 2]), &unambiguous).is_ok());

    // With casting enabled both tuple members accept the same array.
    let ambiguous = Schema::union(vec![
        Schema::tuple(vec![Schema::int()]),
        Schema::tuple(vec![Schema::float()]),
    ]);
    let err = l.load(&json!([1]), &ambiguous).unwrap_err();
    assert!(err.description().contains("ambiguous"));
}

/// Resolution is deterministic: repeated loads of the same value against
/// the same union give the same member.
#[test]
fn test_repeated_resolution_is_stable() {
    let schema = animal_union();
    let data = json!({"kind": "cat", "lives": 9});
    let l = Loader::new();
    for _ in 0..3 {
        let v = l.load(&data, &schema).unwrap();
        let TypedValue::Record(r) = v else { panic!("expected record") };
        assert_eq!(r.schema.name, "Cat");
    }
}
