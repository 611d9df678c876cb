//! JSON <-> BSON conversion for the remote adapter.

use crate::errors::DbError;
use crate::types::Document;
use mongodb::bson::{self, Bson};
use serde_json::Value;

/// Convert a JSON object into a `bson::Document`.
pub fn to_bson_document(doc: &Document) -> Result<bson::Document, DbError> {
    bson::to_document(doc).map_err(|e| DbError::InvalidUpdate(format!("not BSON-encodable: {e}")))
}

/// Convert a `bson::Document` back into a JSON object. ObjectIds and dates come out
/// in relaxed extended JSON form (`{"$oid": ...}`).
#[must_use]
pub fn from_bson_document(doc: bson::Document) -> Document {
    match Bson::Document(doc).into_relaxed_extjson() {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

/// Convert a single BSON value into JSON.
#[must_use]
pub fn from_bson(val: Bson) -> Value {
    val.into_relaxed_extjson()
}

/// Render an inserted id the way the local store does: hex for ObjectIds, raw strings as-is.
#[must_use]
pub fn id_to_string(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        Bson::Int32(i) => i.to_string(),
        Bson::Int64(i) => i.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_object_round_trips_through_bson() {
        let Value::Object(d) = json!({"department": "math", "fees": {"term1": 150}, "tags": ["a", null]}) else {
            unreachable!()
        };
        let b = to_bson_document(&d).unwrap();
        assert_eq!(b.get_str("department").unwrap(), "math");
        let back = from_bson_document(b);
        assert_eq!(back["fees"]["term1"], json!(150));
        assert_eq!(back["tags"], json!(["a", null]));
    }

    #[test]
    fn object_id_renders_as_hex() {
        let oid = bson::oid::ObjectId::new();
        assert_eq!(id_to_string(&Bson::ObjectId(oid)), oid.to_hex());
        assert_eq!(id_to_string(&Bson::String("x1".into())), "x1");
    }
}
