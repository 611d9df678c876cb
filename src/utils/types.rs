use serde_json::{Map, Value};

pub type CollectionName = String;
pub type DocumentId = String;

/// A schema-less record: field name to any JSON value.
pub type Document = Map<String, Value>;

/// Flat field-equality query. Every listed field must be present and equal.
pub type Query = Map<String, Value>;

/// Which backing implementation serves the collection interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Local,
    Remote,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Remote => f.write_str("remote"),
        }
    }
}
