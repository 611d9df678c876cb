use serde_json::Value;

use crate::types::{Document, Query};

/// True if every field in `query` is present in `doc` with an equal value.
/// Fields absent from the query are unconstrained; the empty query matches everything.
#[must_use]
pub fn matches(doc: &Document, query: &Query) -> bool {
    query.iter().all(|(k, want)| doc.get(k).is_some_and(|have| values_equal(have, want)))
}

/// Structural equality with numbers compared by value, so `1` equals `1.0`.
#[must_use]
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if x == y {
                return true;
            }
            match (x.as_f64(), y.as_f64()) {
                (Some(fx), Some(fy)) => fx == fy,
                _ => false,
            }
        }
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs.iter().all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

/// Does an array element satisfy a `$pull` condition? Object conditions match
/// object elements field-by-field; anything else is compared for equality.
#[must_use]
pub fn element_matches(elem: &Value, cond: &Value) -> bool {
    match (cond, elem) {
        (Value::Object(q), Value::Object(d)) => matches(d, q),
        (Value::Object(_), _) => false,
        _ => values_equal(elem, cond),
    }
}

/// Unique non-null values of `field`, first-seen order. Array values contribute
/// their elements.
#[must_use]
pub fn distinct_values<'a, I>(docs: I, field: &str) -> Vec<Value>
where
    I: IntoIterator<Item = &'a Document>,
{
    let mut out: Vec<Value> = Vec::new();
    let mut push = |v: &Value| {
        if !v.is_null() && !out.iter().any(|seen| values_equal(seen, v)) {
            out.push(v.clone());
        }
    };
    for d in docs {
        match d.get(field) {
            Some(Value::Array(items)) => items.iter().for_each(&mut push),
            Some(v) => push(v),
            None => {}
        }
    }
    out
}
