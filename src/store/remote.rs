//! Pass-through to a MongoDB deployment. Only parameter marshaling (JSON <-> BSON)
//! happens here; matching and update semantics are the server's.

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{self, Bson, doc};
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::{Collection, DocumentStore};
use crate::config::RemoteConfig;
use crate::errors::DbError;
use crate::query::{
    Cursor, DeleteResult, InsertManyResult, InsertOneResult, UpdateOptions, UpdateResult,
    UpdateSpec,
};
use crate::types::{Backend, CollectionName, Document, Query};
use crate::utils::fsutil::validate_collection_name;
use crate::utils::json::{from_bson, from_bson_document, id_to_string, to_bson_document};

#[derive(Debug, Clone)]
pub struct RemoteStore {
    db: Database,
}

impl RemoteStore {
    /// Build a client and prove the deployment is reachable with a `ping`, all within
    /// `connect_timeout_ms`.
    ///
    /// # Errors
    /// Returns `Connection` on a bad URI, auth failure, unreachable server or timeout.
    pub async fn connect(cfg: &RemoteConfig) -> Result<Self, DbError> {
        let timeout = Duration::from_millis(cfg.connect_timeout_ms.max(1));
        let attempt = async {
            let mut opts = ClientOptions::parse(&cfg.uri).await?;
            if opts.app_name.is_none() {
                opts.app_name = cfg.app_name.clone();
            }
            opts.connect_timeout = Some(timeout);
            opts.server_selection_timeout = Some(timeout);
            let client = Client::with_options(opts)?;
            let db = client.database(&cfg.database);
            db.run_command(doc! { "ping": 1 }).await?;
            Ok::<_, mongodb::error::Error>(db)
        };
        match tokio::time::timeout(timeout, attempt).await {
            Ok(Ok(db)) => {
                log::info!("remote: connected to database {}", cfg.database);
                Ok(Self { db })
            }
            Ok(Err(e)) => Err(DbError::Connection(e.to_string())),
            Err(_) => Err(DbError::Connection(format!(
                "handshake timed out after {} ms",
                timeout.as_millis()
            ))),
        }
    }

    #[must_use]
    pub fn remote_collection(&self, name: &str) -> RemoteCollection {
        RemoteCollection {
            name: name.to_string(),
            inner: self.db.collection::<bson::Document>(name),
        }
    }
}

#[async_trait]
impl DocumentStore for RemoteStore {
    fn backend(&self) -> Backend {
        Backend::Remote
    }

    fn collection(&self, name: &str) -> Result<Arc<dyn Collection>, DbError> {
        validate_collection_name(name)?;
        Ok(Arc::new(self.remote_collection(name)))
    }

    async fn list_collection_names(&self) -> Result<Vec<String>, DbError> {
        let mut names = self.db.list_collection_names().await?;
        names.sort();
        Ok(names)
    }
}

#[derive(Debug, Clone)]
pub struct RemoteCollection {
    name: CollectionName,
    inner: mongodb::Collection<bson::Document>,
}

#[async_trait]
impl Collection for RemoteCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find_one(&self, query: &Query) -> Result<Option<Document>, DbError> {
        let found = self.inner.find_one(to_bson_document(query)?).await?;
        Ok(found.map(from_bson_document))
    }

    async fn find(&self, query: &Query) -> Result<Cursor, DbError> {
        let cursor = self.inner.find(to_bson_document(query)?).await?;
        let docs: Vec<bson::Document> = cursor.try_collect().await?;
        Ok(Cursor::new(docs.into_iter().map(from_bson_document).collect()))
    }

    async fn distinct(&self, field: &str) -> Result<Vec<Value>, DbError> {
        let values = self.inner.distinct(field, bson::Document::new()).await?;
        Ok(values.into_iter().filter(|b| !matches!(b, Bson::Null)).map(from_bson).collect())
    }

    async fn count(&self, query: &Query) -> Result<u64, DbError> {
        Ok(self.inner.count_documents(to_bson_document(query)?).await?)
    }

    async fn insert_one(&self, doc: Document) -> Result<InsertOneResult, DbError> {
        let r = self.inner.insert_one(to_bson_document(&doc)?).await?;
        log::info!(target: crate::utils::logger::AUDIT_TARGET, "remote insert_one collection={}", self.name);
        Ok(InsertOneResult { inserted_id: id_to_string(&r.inserted_id) })
    }

    async fn insert_many(&self, docs: Vec<Document>) -> Result<InsertManyResult, DbError> {
        if docs.is_empty() {
            return Ok(InsertManyResult::default());
        }
        let docs = docs.iter().map(to_bson_document).collect::<Result<Vec<_>, _>>()?;
        let r = self.inner.insert_many(docs).await?;
        Ok(InsertManyResult { inserted_count: r.inserted_ids.len() as u64 })
    }

    async fn update_one(
        &self,
        query: &Query,
        update: &Value,
        options: UpdateOptions,
    ) -> Result<UpdateResult, DbError> {
        // Parse locally so both stores reject the same malformed specs.
        let spec = UpdateSpec::parse(update)?;
        let update = to_bson_document(&spec.to_operator_document())?;
        let r = self
            .inner
            .update_one(to_bson_document(query)?, update)
            .upsert(options.upsert)
            .await?;
        let upserted_id = r.upserted_id.as_ref().map(id_to_string);
        Ok(UpdateResult {
            matched_count: r.matched_count,
            modified_count: r.modified_count,
            upserted_count: u64::from(upserted_id.is_some()),
            upserted_id,
        })
    }

    async fn delete_one(&self, query: &Query) -> Result<DeleteResult, DbError> {
        let r = self.inner.delete_one(to_bson_document(query)?).await?;
        Ok(DeleteResult { deleted_count: r.deleted_count })
    }
}
