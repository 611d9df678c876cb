//! The collection interface shared by the local and remote stores.

pub mod local;
#[cfg(feature = "remote")]
pub mod remote;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::errors::DbError;
use crate::query::{
    Cursor, DeleteResult, InsertManyResult, InsertOneResult, UpdateOptions, UpdateResult,
};
use crate::types::{Backend, Document, Query};

pub use local::{LocalCollection, LocalStore};
#[cfg(feature = "remote")]
pub use remote::{RemoteCollection, RemoteStore};

/// A named table of schema-less documents.
///
/// Both stores implement this with identical success/failure semantics so callers
/// never need to know which one is active.
#[async_trait]
pub trait Collection: Send + Sync {
    fn name(&self) -> &str;

    /// First document in insertion order matching `query`.
    async fn find_one(&self, query: &Query) -> Result<Option<Document>, DbError>;

    /// All matching documents, in insertion order.
    async fn find(&self, query: &Query) -> Result<Cursor, DbError>;

    /// Unique non-null values of `field` across the table.
    async fn distinct(&self, field: &str) -> Result<Vec<Value>, DbError>;

    async fn count(&self, query: &Query) -> Result<u64, DbError>;

    async fn insert_one(&self, doc: Document) -> Result<InsertOneResult, DbError>;

    /// All-or-nothing append.
    async fn insert_many(&self, docs: Vec<Document>) -> Result<InsertManyResult, DbError>;

    /// Apply `update` (`$set`/`$push`/`$pull` or a plain merge) to the first match,
    /// inserting a seeded document when nothing matches and `options.upsert` is set.
    async fn update_one(
        &self,
        query: &Query,
        update: &Value,
        options: UpdateOptions,
    ) -> Result<UpdateResult, DbError>;

    /// Remove the first matching document.
    async fn delete_one(&self, query: &Query) -> Result<DeleteResult, DbError>;
}

/// A set of named collections.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn backend(&self) -> Backend;

    /// Handle to `name`, creating the table on first reference.
    fn collection(&self, name: &str) -> Result<Arc<dyn Collection>, DbError>;

    async fn list_collection_names(&self) -> Result<Vec<String>, DbError>;
}
