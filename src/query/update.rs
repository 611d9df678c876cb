use serde_json::Value;

use crate::errors::DbError;
use crate::types::{Document, Query};

use super::eval::{element_matches, values_equal};
use super::types::UpdateSpec;

fn set_field(doc: &mut Document, key: &str, value: &Value) -> bool {
    match doc.get(key) {
        Some(old) if values_equal(old, value) => false,
        _ => {
            doc.insert(key.to_string(), value.clone());
            true
        }
    }
}

fn push_field(doc: &mut Document, key: &str, value: &Value) -> Result<(), DbError> {
    match doc.get_mut(key) {
        Some(Value::Array(items)) => items.push(value.clone()),
        Some(Value::Null) | None => {
            doc.insert(key.to_string(), Value::Array(vec![value.clone()]));
        }
        Some(_) => {
            return Err(DbError::InvalidUpdate(format!("$push target '{key}' is not an array")));
        }
    }
    Ok(())
}

fn pull_field(doc: &mut Document, key: &str, cond: &Value) -> bool {
    let Some(Value::Array(items)) = doc.get_mut(key) else {
        return false;
    };
    let before = items.len();
    items.retain(|e| !element_matches(e, cond));
    items.len() != before
}

/// Apply `spec` to `doc`. Returns whether the document changed.
///
/// The document is only touched when the whole spec applies cleanly.
///
/// # Errors
/// Returns `InvalidUpdate` if `$push` targets a field holding a non-array value.
pub fn apply_update(doc: &mut Document, spec: &UpdateSpec) -> Result<bool, DbError> {
    let mut work = doc.clone();
    let mut changed = false;
    match spec {
        UpdateSpec::Merge(fields) => {
            for (k, v) in fields {
                changed |= set_field(&mut work, k, v);
            }
        }
        UpdateSpec::Operators { set, push, pull } => {
            for (k, v) in set {
                changed |= set_field(&mut work, k, v);
            }
            for (k, v) in push {
                push_field(&mut work, k, v)?;
                changed = true;
            }
            for (k, cond) in pull {
                changed |= pull_field(&mut work, k, cond);
            }
        }
    }
    if changed {
        *doc = work;
    }
    Ok(changed)
}

/// Build the document an upsert inserts: the query's field-value pairs with the
/// update applied on top.
///
/// # Errors
/// See [`apply_update`].
pub fn upsert_seed(query: &Query, spec: &UpdateSpec) -> Result<Document, DbError> {
    let mut seed = query.clone();
    apply_update(&mut seed, spec)?;
    Ok(seed)
}
