//! File-backed document store: one pretty-printed JSON array per table under a data directory.
//!
//! Every mutation is applied in memory under the table's mutex, written through to disk
//! atomically, and rolled back in memory if the write fails. Memory therefore never holds
//! state that is not also on disk.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use super::{Collection, DocumentStore};
use crate::errors::DbError;
use crate::query::{
    Cursor, DeleteResult, InsertManyResult, InsertOneResult, UpdateOptions, UpdateResult,
    UpdateSpec, apply_update, distinct_values, matches, upsert_seed,
};
use crate::types::{Backend, CollectionName, Document, DocumentId, Query};
use crate::utils::fsutil::{self, TABLE_EXT};
use crate::utils::logger::AUDIT_TARGET;

struct Table {
    name: CollectionName,
    path: PathBuf,
    docs: Vec<Document>,
}

impl Table {
    fn persist(&self) -> Result<(), DbError> {
        fsutil::write_json_atomic(&self.path, &self.docs).map_err(|e| {
            log::error!("local: failed to save table {}: {}", self.name, e);
            DbError::Io(format!("saving {}: {e}", self.path.display()))
        })
    }

    fn position(&self, query: &Query) -> Option<usize> {
        self.docs.iter().position(|d| matches(d, query))
    }
}

/// The identifier reported for an inserted document: its own `_id`, else `id`,
/// else a millisecond timestamp token.
#[must_use]
pub fn document_id(doc: &Document) -> DocumentId {
    let own = doc.get("_id").or_else(|| doc.get("id"));
    match own {
        Some(Value::String(s)) => s.clone(),
        Some(v) if !v.is_null() && !v.is_object() && !v.is_array() => v.to_string(),
        _ => chrono::Utc::now().timestamp_millis().to_string(),
    }
}

fn elapsed_ms(start: Instant) -> u128 {
    start.elapsed().as_millis()
}

/// Local substitute for the remote database.
pub struct LocalStore {
    data_dir: PathBuf,
    tables: RwLock<HashMap<CollectionName, Arc<Mutex<Table>>>>,
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("data_dir", &self.data_dir)
            .field("tables", &self.collection_names())
            .finish()
    }
}

impl LocalStore {
    /// Open (or create) the data directory and load every `*.json` table in it.
    ///
    /// Unreadable table files are moved aside and their tables start empty; an
    /// unreadable directory yields an empty store.
    ///
    /// # Errors
    /// Returns an error only if the data directory cannot be created.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, DbError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir).map_err(|e| {
            DbError::Io(format!("creating data dir {}: {e}", data_dir.display()))
        })?;
        let tables = Self::load_tables(&data_dir);
        let mut names: Vec<&String> = tables.keys().collect();
        names.sort();
        log::info!("local: opened {} with tables {:?}", data_dir.display(), names);
        Ok(Self { data_dir, tables: RwLock::new(tables) })
    }

    fn load_tables(dir: &Path) -> HashMap<CollectionName, Arc<Mutex<Table>>> {
        let mut out = HashMap::new();
        let entries = match fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) => {
                log::error!("local: cannot list {}: {}; starting empty", dir.display(), e);
                return out;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(TABLE_EXT) || !path.is_file() {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };
            let docs = match fsutil::read_json_array(&path) {
                Ok(d) => d,
                Err(e) => {
                    log::warn!("local: table {} unreadable ({}); starting it empty", name, e);
                    match fsutil::quarantine(&path) {
                        Ok(moved) => log::warn!("local: moved {} to {}", path.display(), moved.display()),
                        Err(qe) => log::warn!("local: could not move {} aside: {}", path.display(), qe),
                    }
                    Vec::new()
                }
            };
            out.insert(name.clone(), Arc::new(Mutex::new(Table { name, path, docs })));
        }
        out
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Sorted table names.
    #[must_use]
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Handle to table `name`; a new table is created and persisted empty.
    ///
    /// # Errors
    /// Returns `InvalidCollectionName` if `name` cannot be used as a file stem.
    pub fn local_collection(&self, name: &str) -> Result<LocalCollection, DbError> {
        fsutil::validate_collection_name(name)?;
        if let Some(t) = self.tables.read().get(name) {
            return Ok(LocalCollection { name: name.to_string(), table: t.clone() });
        }
        let mut tables = self.tables.write();
        let table = tables
            .entry(name.to_string())
            .or_insert_with(|| {
                let t = Table {
                    name: name.to_string(),
                    path: fsutil::table_path(&self.data_dir, name),
                    docs: Vec::new(),
                };
                // A failed initial save is retried by the first mutation.
                if t.persist().is_ok() {
                    log::info!("local: created table {}", name);
                }
                Arc::new(Mutex::new(t))
            })
            .clone();
        Ok(LocalCollection { name: name.to_string(), table })
    }
}

#[async_trait]
impl DocumentStore for LocalStore {
    fn backend(&self) -> Backend {
        Backend::Local
    }

    fn collection(&self, name: &str) -> Result<Arc<dyn Collection>, DbError> {
        Ok(Arc::new(self.local_collection(name)?))
    }

    async fn list_collection_names(&self) -> Result<Vec<String>, DbError> {
        Ok(self.collection_names())
    }
}

/// Handle to one local table. Cheap to clone; all clones share the table lock.
#[derive(Clone)]
pub struct LocalCollection {
    name: CollectionName,
    table: Arc<Mutex<Table>>,
}

impl LocalCollection {
    #[must_use]
    pub fn find_first(&self, query: &Query) -> Option<Document> {
        let start = Instant::now();
        let found = {
            let t = self.table.lock();
            t.position(query).map(|i| t.docs[i].clone())
        };
        crate::dev_trace!(
            "{{\"op\":\"find_one\",\"table\":\"{}\",\"duration_ms\":{},\"found\":{}}}",
            self.name,
            elapsed_ms(start),
            found.is_some()
        );
        found
    }

    #[must_use]
    pub fn find_all(&self, query: &Query) -> Vec<Document> {
        let start = Instant::now();
        let docs: Vec<Document> =
            self.table.lock().docs.iter().filter(|d| matches(d, query)).cloned().collect();
        crate::dev_trace!(
            "{{\"op\":\"find\",\"table\":\"{}\",\"duration_ms\":{},\"result_count\":{}}}",
            self.name,
            elapsed_ms(start),
            docs.len()
        );
        docs
    }

    #[must_use]
    pub fn distinct_field(&self, field: &str) -> Vec<Value> {
        distinct_values(self.table.lock().docs.iter(), field)
    }

    #[must_use]
    pub fn count_matching(&self, query: &Query) -> u64 {
        self.table.lock().docs.iter().filter(|d| matches(d, query)).count() as u64
    }

    /// # Errors
    /// Returns `Io` if the table file cannot be written; the table is left unchanged.
    pub fn insert_document(&self, doc: Document) -> Result<InsertOneResult, DbError> {
        let start = Instant::now();
        let inserted_id = document_id(&doc);
        let mut t = self.table.lock();
        t.docs.push(doc);
        if let Err(e) = t.persist() {
            t.docs.pop();
            return Err(e);
        }
        log::info!(target: AUDIT_TARGET, "insert_one table={} id={}", self.name, inserted_id);
        crate::dev_trace!(
            "{{\"op\":\"insert_one\",\"table\":\"{}\",\"duration_ms\":{},\"table_len\":{}}}",
            self.name,
            elapsed_ms(start),
            t.docs.len()
        );
        Ok(InsertOneResult { inserted_id })
    }

    /// # Errors
    /// Returns `Io` if the table file cannot be written; none of `docs` is kept.
    pub fn insert_documents(&self, docs: Vec<Document>) -> Result<InsertManyResult, DbError> {
        let start = Instant::now();
        let n = docs.len();
        if n == 0 {
            return Ok(InsertManyResult::default());
        }
        let mut t = self.table.lock();
        let before = t.docs.len();
        t.docs.extend(docs);
        if let Err(e) = t.persist() {
            t.docs.truncate(before);
            return Err(e);
        }
        log::info!(target: AUDIT_TARGET, "insert_many table={} count={}", self.name, n);
        crate::dev_trace!(
            "{{\"op\":\"insert_many\",\"table\":\"{}\",\"duration_ms\":{},\"inserted\":{}}}",
            self.name,
            elapsed_ms(start),
            n
        );
        Ok(InsertManyResult { inserted_count: n as u64 })
    }

    /// # Errors
    /// Returns `InvalidUpdate` for a malformed spec or `$push` onto a non-array,
    /// and `Io` if the write fails. The table is unchanged on any error.
    pub fn update_first(
        &self,
        query: &Query,
        update: &Value,
        options: UpdateOptions,
    ) -> Result<UpdateResult, DbError> {
        let start = Instant::now();
        let spec = UpdateSpec::parse(update)?;
        let mut t = self.table.lock();
        let result = match t.position(query) {
            Some(idx) => {
                let mut doc = t.docs[idx].clone();
                let changed = apply_update(&mut doc, &spec)?;
                if changed {
                    let old = std::mem::replace(&mut t.docs[idx], doc);
                    if let Err(e) = t.persist() {
                        t.docs[idx] = old;
                        return Err(e);
                    }
                    log::info!(target: AUDIT_TARGET, "update_one table={} index={}", self.name, idx);
                }
                UpdateResult { matched_count: 1, modified_count: u64::from(changed), ..Default::default() }
            }
            None if options.upsert => {
                let seed = upsert_seed(query, &spec)?;
                let id = document_id(&seed);
                t.docs.push(seed);
                if let Err(e) = t.persist() {
                    t.docs.pop();
                    return Err(e);
                }
                log::info!(target: AUDIT_TARGET, "upsert table={} id={}", self.name, id);
                UpdateResult { upserted_count: 1, upserted_id: Some(id), ..Default::default() }
            }
            None => UpdateResult::default(),
        };
        crate::dev_trace!(
            "{{\"op\":\"update_one\",\"table\":\"{}\",\"duration_ms\":{},\"matched\":{},\"modified\":{},\"upserted\":{}}}",
            self.name,
            elapsed_ms(start),
            result.matched_count,
            result.modified_count,
            result.upserted_count
        );
        Ok(result)
    }

    /// Removes the first match only, like the remote store.
    ///
    /// # Errors
    /// Returns `Io` if the write fails; the document is restored in memory.
    pub fn delete_first(&self, query: &Query) -> Result<DeleteResult, DbError> {
        let start = Instant::now();
        let mut t = self.table.lock();
        let Some(idx) = t.position(query) else {
            return Ok(DeleteResult::default());
        };
        let removed = t.docs.remove(idx);
        if let Err(e) = t.persist() {
            t.docs.insert(idx, removed);
            return Err(e);
        }
        log::info!(target: AUDIT_TARGET, "delete_one table={} index={}", self.name, idx);
        crate::dev_trace!(
            "{{\"op\":\"delete_one\",\"table\":\"{}\",\"duration_ms\":{},\"deleted\":1}}",
            self.name,
            elapsed_ms(start)
        );
        Ok(DeleteResult { deleted_count: 1 })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.table.lock().docs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Collection for LocalCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find_one(&self, query: &Query) -> Result<Option<Document>, DbError> {
        Ok(self.find_first(query))
    }

    async fn find(&self, query: &Query) -> Result<Cursor, DbError> {
        Ok(Cursor::new(self.find_all(query)))
    }

    async fn distinct(&self, field: &str) -> Result<Vec<Value>, DbError> {
        Ok(self.distinct_field(field))
    }

    async fn count(&self, query: &Query) -> Result<u64, DbError> {
        Ok(self.count_matching(query))
    }

    async fn insert_one(&self, doc: Document) -> Result<InsertOneResult, DbError> {
        self.insert_document(doc)
    }

    async fn insert_many(&self, docs: Vec<Document>) -> Result<InsertManyResult, DbError> {
        self.insert_documents(docs)
    }

    async fn update_one(
        &self,
        query: &Query,
        update: &Value,
        options: UpdateOptions,
    ) -> Result<UpdateResult, DbError> {
        self.update_first(query, update, options)
    }

    async fn delete_one(&self, query: &Query) -> Result<DeleteResult, DbError> {
        self.delete_first(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Document {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn document_id_prefers_own_fields() {
        assert_eq!(document_id(&obj(json!({"_id": "abc", "id": "x"}))), "abc");
        assert_eq!(document_id(&obj(json!({"id": 42}))), "42");
        let generated = document_id(&obj(json!({"name": "n"})));
        assert!(generated.parse::<i64>().is_ok());
    }

    #[test]
    fn first_reference_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path().join("data")).unwrap();
        let col = store.local_collection("admissions").unwrap();
        assert!(col.is_empty());
        let p = fsutil::table_path(store.data_dir(), "admissions");
        assert_eq!(fs::read_to_string(p).unwrap().trim(), "[]");
        assert_eq!(store.collection_names(), vec!["admissions".to_string()]);
    }

    #[test]
    fn failed_save_rolls_back_memory() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        let store = LocalStore::open(&data).unwrap();
        let col = store.local_collection("staff").unwrap();
        col.insert_document(obj(json!({"name": "A"}))).unwrap();
        // Occupy the table path with a directory so the rename over it fails.
        let p = fsutil::table_path(&data, "staff");
        fs::remove_file(&p).unwrap();
        fs::create_dir(&p).unwrap();
        fs::write(p.join("keep"), "x").unwrap();
        let err = col.insert_documents(vec![obj(json!({"name": "B"})), obj(json!({"name": "C"}))]);
        assert!(matches!(err, Err(DbError::Io(_))));
        assert_eq!(col.len(), 1);
        assert!(col.delete_first(&obj(json!({"name": "A"}))).is_err());
        assert_eq!(col.len(), 1);
    }

    #[test]
    fn dev_trace_reports_each_operation() {
        let _g = crate::utils::devlog::enable_thread_sink();
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        let col = store.local_collection("board").unwrap();
        col.insert_document(obj(json!({"id": "1"}))).unwrap();
        let _ = col.find_all(&Query::new());
        col.update_first(&obj(json!({"id": "2"})), &json!({"$set": {"x": 1}}), UpdateOptions::upsert())
            .unwrap();
        let lines = crate::utils::devlog::drain();
        assert!(lines.iter().any(|l| l.contains("\"op\":\"insert_one\"")));
        assert!(lines.iter().any(|l| l.contains("\"op\":\"find\"") && l.contains("\"result_count\":1")));
        assert!(lines.iter().any(|l| l.contains("\"op\":\"update_one\"") && l.contains("\"upserted\":1")));
    }
}
