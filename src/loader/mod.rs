//! Recursive descent loader
//!
//! `load(value, schema)` resolves a handler through an ordered
//! (condition, transform) registry, invokes it, and on failure prepends a
//! trace frame before re-raising. Container, record and union transforms
//! call back into `load` recursively.
//!
//! Registry order defines priority: the first matching condition wins.
//! Dispatch is memoized per schema identity (`Arc` pointer); mutating the
//! handler list after the first load is undefined behavior, the cache is
//! not invalidated.

mod basic;
mod container;
mod record;
mod union;

use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;
use std::sync::Arc;

use serde_json::Value;

use crate::errors::{Annotation, Error, LoadResult, TraceItem};
use crate::schema::{LiteralValue, ScalarKind, Schema};
use crate::value::TypedValue;

pub(crate) use record::RecordPlan;
pub(crate) use union::Discriminator;

/// Condition deciding whether a handler applies to a schema
pub type ConditionFn = dyn Fn(&Loader, &Arc<Schema>) -> LoadResult<bool>;

/// Transform loading a value against a schema
pub type TransformFn = dyn Fn(&Loader, &Value, &Arc<Schema>) -> LoadResult<TypedValue>;

/// One registry entry: a condition and the transform it guards
#[derive(Clone)]
pub struct LoadEntry {
    pub condition: Rc<ConditionFn>,
    pub transform: Rc<TransformFn>,
}

impl LoadEntry {
    pub fn new(
        condition: impl Fn(&Loader, &Arc<Schema>) -> LoadResult<bool> + 'static,
        transform: impl Fn(&Loader, &Value, &Arc<Schema>) -> LoadResult<TypedValue> + 'static,
    ) -> Self {
        Self {
            condition: Rc::new(condition),
            transform: Rc::new(transform),
        }
    }
}

/// A loader object that recursively loads plain values into typed ones.
///
/// Configuration is plain public fields, set after construction:
///
/// - `basic_types`: scalar kinds treated as building blocks; used by the
///   union resolver's passthrough step and the container fast paths.
/// - `basic_cast`: when enabled (default), scalar mismatches fall back to
///   casting instead of raising.
/// - `fail_on_extra`: strict mode; undeclared record fields and
///   overlong fixed tuples become errors instead of being dropped.
/// - `raise_condition_errors`: when disabled, a failing handler condition
///   counts as a non-match instead of propagating.
/// - `dict_equivalence`: where an object is expected, accept an array of
///   `[name, value]` pairs and normalize it first.
/// - `mangle_key`: metadata key selecting the external field name.
/// - `union_debug_conflict`: try every union member and report ambiguity
///   instead of short-circuiting on the first success.
/// - `handlers`: the ordered registry itself, the extension point for
///   custom shapes.
pub struct Loader {
    pub basic_types: BTreeSet<ScalarKind>,
    pub basic_cast: bool,
    pub fail_on_extra: bool,
    pub raise_condition_errors: bool,
    pub dict_equivalence: bool,
    pub mangle_key: String,
    pub union_debug_conflict: bool,
    pub handlers: Vec<LoadEntry>,
    /// Forward-reference table; `None` disables forward references
    refs: RefCell<Option<HashMap<String, Arc<Schema>>>>,
    /// Schema identity -> handler index
    dispatch: RefCell<HashMap<usize, usize>>,
    /// Record identity -> precomputed load plan
    plans: RefCell<HashMap<usize, Rc<RecordPlan>>>,
    /// Union identity -> discriminator table
    discriminators: RefCell<HashMap<usize, Option<Rc<Discriminator>>>>,
}

impl Loader {
    /// Creates a loader with the default configuration and handler set.
    pub fn new() -> Self {
        Self {
            basic_types: [
                ScalarKind::Null,
                ScalarKind::Bool,
                ScalarKind::Int,
                ScalarKind::Float,
                ScalarKind::Str,
            ]
            .into_iter()
            .collect(),
            basic_cast: true,
            fail_on_extra: false,
            raise_condition_errors: true,
            dict_equivalence: true,
            mangle_key: "name".to_string(),
            union_debug_conflict: false,
            handlers: Self::default_handlers(),
            refs: RefCell::new(Some(HashMap::new())),
            dispatch: RefCell::new(HashMap::new()),
            plans: RefCell::new(HashMap::new()),
            discriminators: RefCell::new(HashMap::new()),
        }
    }

    /// The builtin registry, in priority order.
    fn default_handlers() -> Vec<LoadEntry> {
        vec![
            LoadEntry::new(
                |_, s| Ok(matches!(&**s, Schema::Scalar(ScalarKind::Null))),
                basic::load_null,
            ),
            LoadEntry::new(|_, s| Ok(matches!(&**s, Schema::Union(_))), union::load_union),
            LoadEntry::new(
                |_, s| Ok(matches!(&**s, Schema::Optional(_))),
                basic::load_optional,
            ),
            LoadEntry::new(
                |l, s| Ok(matches!(&**s, Schema::Scalar(k) if l.basic_types.contains(k))),
                basic::load_scalar,
            ),
            LoadEntry::new(
                |_, s| Ok(matches!(&**s, Schema::Literal(_))),
                basic::load_literal,
            ),
            LoadEntry::new(|_, s| Ok(matches!(&**s, Schema::Enum(_))), record::load_enum),
            LoadEntry::new(
                |_, s| Ok(matches!(&**s, Schema::Tuple(_))),
                container::load_tuple,
            ),
            LoadEntry::new(
                |_, s| Ok(matches!(&**s, Schema::Variadic(_))),
                container::load_variadic,
            ),
            LoadEntry::new(|_, s| Ok(matches!(&**s, Schema::List(_))), container::load_list),
            LoadEntry::new(|_, s| Ok(matches!(&**s, Schema::Map(_, _))), container::load_map),
            LoadEntry::new(
                |_, s| Ok(matches!(&**s, Schema::Set(_) | Schema::FrozenSet(_))),
                container::load_set,
            ),
            LoadEntry::new(
                |_, s| Ok(matches!(&**s, Schema::Record(_))),
                record::load_record,
            ),
            LoadEntry::new(|_, s| Ok(matches!(&**s, Schema::Ref(_))), record::load_ref),
            LoadEntry::new(|_, s| Ok(matches!(&**s, Schema::Alias(_, _))), record::load_alias),
            LoadEntry::new(|_, s| Ok(matches!(&**s, Schema::Any)), basic::load_any),
            LoadEntry::new(
                |_, s| Ok(matches!(&**s, Schema::Special(_))),
                basic::load_special,
            ),
        ]
    }

    /// Returns the index of the first handler whose condition matches.
    ///
    /// Condition errors propagate unless `raise_condition_errors` is off,
    /// in which case the entry counts as a non-match.
    pub fn index(&self, schema: &Arc<Schema>) -> LoadResult<usize> {
        match self.find(schema)? {
            Some(i) => Ok(i),
            None => Err(Error::type_error(
                format!("no matching handler for type {}", schema.type_name()),
                &Value::Null,
                schema.type_name(),
            )),
        }
    }

    fn find(&self, schema: &Arc<Schema>) -> LoadResult<Option<usize>> {
        for (i, entry) in self.handlers.iter().enumerate() {
            let matched = match (entry.condition)(self, schema) {
                Ok(m) => m,
                Err(e) => {
                    if self.raise_condition_errors {
                        return Err(e);
                    }
                    false
                }
            };
            if matched {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    /// Cached handler resolution, keyed on schema identity.
    fn resolve(&self, schema: &Arc<Schema>) -> LoadResult<Option<usize>> {
        let key = Arc::as_ptr(schema) as usize;
        if let Some(&i) = self.dispatch.borrow().get(&key) {
            return Ok(Some(i));
        }
        let found = self.find(schema)?;
        if let Some(i) = found {
            self.dispatch.borrow_mut().insert(key, i);
        }
        Ok(found)
    }

    /// Loads a plain value into the typed shape declared by `schema`.
    pub fn load(&self, value: &Value, schema: &Arc<Schema>) -> LoadResult<TypedValue> {
        self.load_with(value, schema, None)
    }

    /// Loads with an annotation describing this recursion step; the
    /// annotation ends up in the trace frame this call prepends on failure.
    pub fn load_with(
        &self,
        value: &Value,
        schema: &Arc<Schema>,
        annotation: Option<Annotation>,
    ) -> LoadResult<TypedValue> {
        let index = match self.resolve(schema)? {
            Some(i) => i,
            None => {
                return Err(Error::type_error(
                    format!("cannot deal with values of type {}", schema.type_name()),
                    value,
                    schema.type_name(),
                ))
            }
        };

        self.remember(schema);

        let normalized = self.normalize(value, schema);
        let transform = Rc::clone(&self.handlers[index].transform);
        match transform(self, &normalized, schema) {
            Ok(v) => Ok(v),
            Err(mut e) => {
                e.prepend_trace(TraceItem::new(
                    normalized.into_owned(),
                    schema.type_name(),
                    annotation,
                ));
                Err(e)
            }
        }
    }

    /// Registers a name in the forward-reference table.
    pub fn register_ref(&self, name: impl Into<String>, schema: Arc<Schema>) {
        if let Some(refs) = self.refs.borrow_mut().as_mut() {
            refs.insert(name.into(), schema);
        }
    }

    /// Resolves a forward-reference name.
    pub fn resolve_ref(&self, name: &str) -> Option<Arc<Schema>> {
        self.refs.borrow().as_ref().and_then(|r| r.get(name).cloned())
    }

    /// Disables forward references entirely.
    pub fn disable_refs(&mut self) {
        *self.refs.borrow_mut() = None;
    }

    /// Whether forward references are enabled
    pub fn refs_enabled(&self) -> bool {
        self.refs.borrow().is_some()
    }

    /// Auto-registers named schemas so later `Ref`s can resolve them.
    fn remember(&self, schema: &Arc<Schema>) {
        if let Some(name) = schema.name() {
            if let Some(refs) = self.refs.borrow_mut().as_mut() {
                refs.entry(name.to_string()).or_insert_with(|| Arc::clone(schema));
            }
        }
    }

    /// Dict equivalence: where an object is expected, an array of
    /// `[name, value]` pairs is accepted and normalized first.
    fn normalize<'a>(&self, value: &'a Value, schema: &Schema) -> Cow<'a, Value> {
        if self.dict_equivalence
            && matches!(schema, Schema::Record(_) | Schema::Map(_, _))
            && !value.is_object()
        {
            if let Some(obj) = pairs_to_object(value) {
                return Cow::Owned(Value::Object(obj));
            }
        }
        Cow::Borrowed(value)
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

fn pairs_to_object(value: &Value) -> Option<serde_json::Map<String, Value>> {
    let items = value.as_array()?;
    let mut map = serde_json::Map::with_capacity(items.len());
    for item in items {
        let pair = item.as_array()?;
        if pair.len() != 2 {
            return None;
        }
        let key = pair[0].as_str()?;
        map.insert(key.to_string(), pair[1].clone());
    }
    Some(map)
}

/// The value as an exactly matching scalar of `kind`, without casting.
pub(crate) fn exact_scalar(value: &Value, kind: ScalarKind) -> Option<TypedValue> {
    match (kind, value) {
        (ScalarKind::Null, Value::Null) => Some(TypedValue::Null),
        (ScalarKind::Bool, Value::Bool(b)) => Some(TypedValue::Bool(*b)),
        (ScalarKind::Int, Value::Number(n)) => n.as_i64().map(TypedValue::Int),
        (ScalarKind::Float, Value::Number(n)) if n.is_f64() => n.as_f64().map(TypedValue::Float),
        (ScalarKind::Str, Value::String(s)) => Some(TypedValue::Str(s.clone())),
        _ => None,
    }
}

/// The exact runtime scalar kind of a plain value, with its typed form.
pub(crate) fn scalar_value(value: &Value) -> Option<(ScalarKind, TypedValue)> {
    match value {
        Value::Null => Some((ScalarKind::Null, TypedValue::Null)),
        Value::Bool(b) => Some((ScalarKind::Bool, TypedValue::Bool(*b))),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some((ScalarKind::Int, TypedValue::Int(i)))
            } else if n.is_f64() {
                n.as_f64().map(|f| (ScalarKind::Float, TypedValue::Float(f)))
            } else {
                None
            }
        }
        Value::String(s) => Some((ScalarKind::Str, TypedValue::Str(s.clone()))),
        _ => None,
    }
}

/// The literal form of a plain scalar value.
pub(crate) fn literal_of(value: &Value) -> Option<LiteralValue> {
    match value {
        Value::Bool(b) => Some(LiteralValue::Bool(*b)),
        Value::Number(n) => n.as_i64().map(LiteralValue::Int),
        Value::String(s) => Some(LiteralValue::Str(s.clone())),
        _ => None,
    }
}
