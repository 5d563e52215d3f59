//! Union resolution
//!
//! Members are tried in a deterministic order independent of how the
//! union was declared: exact scalar matches pass through first, then
//! structured members before scalar ones. Tagged unions of records are
//! resolved through a discriminator table when one can be derived.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use serde_json::Value;

use super::{literal_of, scalar_value, Loader};
use crate::errors::{Annotation, Error, LoadResult};
use crate::schema::{LiteralValue, RecordSchema, Schema};
use crate::value::TypedValue;

/// Derived tag table for a union of records sharing a single-valued
/// literal field: tag value -> member index.
pub(crate) struct Discriminator {
    /// External name of the tag field
    pub field: String,
    pub table: HashMap<LiteralValue, usize>,
}

impl Loader {
    /// Returns the cached discriminator for a union, deriving it on first
    /// use. `None` means the union has no usable tag field.
    pub(crate) fn discriminator(
        &self,
        schema: &Arc<Schema>,
        members: &[Arc<Schema>],
    ) -> Option<Rc<Discriminator>> {
        let key = Arc::as_ptr(schema) as usize;
        if let Some(cached) = self.discriminators.borrow().get(&key) {
            return cached.clone();
        }
        let derived = self.derive_discriminator(members).map(Rc::new);
        self.discriminators.borrow_mut().insert(key, derived.clone());
        derived
    }

    fn derive_discriminator(&self, members: &[Arc<Schema>]) -> Option<Discriminator> {
        let records: Vec<&Arc<RecordSchema>> = members
            .iter()
            .map(|m| as_record(m))
            .collect::<Option<Vec<_>>>()?;
        if records.is_empty() {
            return None;
        }

        // Candidate tag fields: literal-typed fields of the first member,
        // checked against every other member. Every literal value of a
        // member's tag maps to that member; a value claimed twice
        // disqualifies the candidate.
        'candidates: for fd in &records[0].fields {
            if literal_values(&fd.schema).is_none() {
                continue;
            }
            let wire = fd.external_name(&self.mangle_key);
            let mut table = HashMap::with_capacity(records.len());
            for (i, rec) in records.iter().enumerate() {
                let Some(tag) = rec
                    .fields
                    .iter()
                    .find(|f| f.external_name(&self.mangle_key) == wire)
                else {
                    continue 'candidates;
                };
                let Some(values) = literal_values(&tag.schema) else {
                    continue 'candidates;
                };
                for value in values {
                    if table.insert(value.clone(), i).is_some() {
                        continue 'candidates;
                    }
                }
            }
            return Some(Discriminator {
                field: wire.to_string(),
                table,
            });
        }
        None
    }
}

fn as_record(schema: &Arc<Schema>) -> Option<&Arc<RecordSchema>> {
    match &**schema {
        Schema::Record(r) => Some(r),
        Schema::Alias(_, inner) => as_record(inner),
        _ => None,
    }
}

fn literal_values(schema: &Schema) -> Option<&[LiteralValue]> {
    match schema {
        Schema::Literal(values) if !values.is_empty() => Some(values),
        _ => None,
    }
}

/// Loads a value against a union of member types.
pub(crate) fn load_union(l: &Loader, value: &Value, schema: &Arc<Schema>) -> LoadResult<TypedValue> {
    let Schema::Union(members) = &**schema else {
        return Err(Error::type_error(
            format!("handler does not apply to type {}", schema.type_name()),
            value,
            schema.type_name(),
        ));
    };

    // Exact scalar matches pass straight through, no member ordering
    // involved.
    if let Some((kind, typed)) = scalar_value(value) {
        if l.basic_types.contains(&kind) {
            let exact = members
                .iter()
                .any(|m| matches!(&**m, Schema::Scalar(k) if *k == kind));
            if exact {
                return Ok(typed);
            }
            if value.is_null() && members.iter().any(|m| matches!(&**m, Schema::Optional(_))) {
                return Ok(TypedValue::Null);
            }
        }
    }

    // Structured members are tried before scalar ones, declaration order
    // preserved within each group.
    let mut candidates: Vec<&Arc<Schema>> = members.iter().filter(|m| !m.is_scalar()).collect();
    candidates.extend(members.iter().filter(|m| m.is_scalar()));

    // Tagged unions of records jump straight to the member the tag names.
    if value.is_object() {
        if let Some(disc) = l.discriminator(schema, members) {
            let tagged = value
                .get(&disc.field)
                .and_then(literal_of)
                .and_then(|lit| disc.table.get(&lit).copied());
            if let Some(i) = tagged {
                let member = &members[i];
                if let Some(pos) = candidates.iter().position(|m| Arc::ptr_eq(*m, member)) {
                    let promoted = candidates.remove(pos);
                    candidates.insert(0, promoted);
                }
            }
        }
    }

    let mut causes = Vec::new();
    let mut successes = Vec::new();
    for member in candidates {
        match l.load_with(value, member, Some(Annotation::union(member.type_name()))) {
            Ok(v) => {
                if !l.union_debug_conflict {
                    return Ok(v);
                }
                successes.push(v);
            }
            Err(e) => causes.push(e),
        }
    }

    match successes.len() {
        0 => Err(Error::value_error(
            format!("value does not match any member of {}", schema.type_name()),
            value,
            schema.type_name(),
        )
        .with_causes(causes)),
        1 => Ok(successes.remove(0)),
        n => Err(Error::value_error(
            format!(
                "{} union members of {} accepted the value (ambiguous schema)",
                n,
                schema.type_name()
            ),
            value,
            schema.type_name(),
        )),
    }
}
