use crate::errors::DbError;
use crate::types::{Document, Query};
use serde_json::Value;

use super::types::UpdateSpec;

fn operator_fields(op: &str, v: Value) -> Result<Vec<(String, Value)>, DbError> {
    match v {
        Value::Object(m) => Ok(m.into_iter().collect()),
        _ => Err(DbError::InvalidUpdate(format!("{op} expects an object of field -> value"))),
    }
}

impl UpdateSpec {
    /// Parse a raw update document (`{"$set": {...}}`, `{"$push": {...}}`, `{"$pull": {...}}`,
    /// or a plain object merged as-is).
    ///
    /// # Errors
    /// Returns `InvalidUpdate` if the spec is not an object, names an unsupported
    /// operator, or mixes operators with plain fields.
    pub fn parse(raw: &Value) -> Result<Self, DbError> {
        let Value::Object(map) = raw else {
            return Err(DbError::InvalidUpdate("update must be an object".into()));
        };
        let has_ops = map.keys().any(|k| k.starts_with('$'));
        if !has_ops {
            return Ok(Self::Merge(map.clone()));
        }
        if let Some(plain) = map.keys().find(|k| !k.starts_with('$')) {
            return Err(DbError::InvalidUpdate(format!(
                "cannot mix operators with plain field '{plain}'"
            )));
        }
        let mut set = Vec::new();
        let mut push = Vec::new();
        let mut pull = Vec::new();
        for (op, v) in map.clone() {
            match op.as_str() {
                "$set" => set = operator_fields(&op, v)?,
                "$push" => push = operator_fields(&op, v)?,
                "$pull" => pull = operator_fields(&op, v)?,
                other => {
                    return Err(DbError::InvalidUpdate(format!("unsupported operator {other}")));
                }
            }
        }
        Ok(Self::Operators { set, push, pull })
    }

    /// The spec in document-database wire form; the plain merge becomes `$set`.
    #[must_use]
    pub fn to_operator_document(&self) -> Document {
        fn as_object(pairs: &[(String, Value)]) -> Value {
            Value::Object(pairs.iter().cloned().collect())
        }
        let mut out = Document::new();
        match self {
            Self::Merge(fields) => {
                out.insert("$set".into(), Value::Object(fields.clone()));
            }
            Self::Operators { set, push, pull } => {
                if !set.is_empty() {
                    out.insert("$set".into(), as_object(set));
                }
                if !push.is_empty() {
                    out.insert("$push".into(), as_object(push));
                }
                if !pull.is_empty() {
                    out.insert("$pull".into(), as_object(pull));
                }
            }
        }
        out
    }
}

/// Parse a JSON string that must be a flat query object.
///
/// # Errors
/// Returns an error if the JSON is malformed or not an object.
pub fn parse_query_json(json: &str) -> Result<Query, DbError> {
    match serde_json::from_str::<Value>(json)? {
        Value::Object(m) => Ok(m),
        _ => Err(DbError::QueryError("query must be a JSON object".into())),
    }
}
