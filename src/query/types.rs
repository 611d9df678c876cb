use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::Document;

/// Parsed update specification. Operators apply in the order `$set`, `$push`, `$pull`.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateSpec {
    Operators {
        set: Vec<(String, Value)>,
        push: Vec<(String, Value)>,
        pull: Vec<(String, Value)>,
    },
    /// No `$` keys at all: fields merge over the matched document.
    Merge(Document),
}

/// Options for `update_one`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOptions {
    #[serde(default)]
    pub upsert: bool,
}

impl UpdateOptions {
    #[must_use]
    pub fn upsert() -> Self {
        Self { upsert: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertOneResult {
    pub inserted_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertManyResult {
    pub inserted_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Modified,
    /// Matched, but the update left the document as it was.
    Unchanged,
    Upserted,
    NoMatch,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upserted_id: Option<String>,
}

impl UpdateResult {
    #[must_use]
    pub fn outcome(&self) -> UpdateOutcome {
        if self.upserted_count > 0 {
            UpdateOutcome::Upserted
        } else if self.modified_count > 0 {
            UpdateOutcome::Modified
        } else if self.matched_count > 0 {
            UpdateOutcome::Unchanged
        } else {
            UpdateOutcome::NoMatch
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub deleted_count: u64,
}
