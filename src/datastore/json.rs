//! JSON-file datastore: the whole store is one JSON document on disk.
//!
//! Layout: `{ "<collection>": { "<_id>": { ...record } } }`. The file and its
//! collection keys must already exist; this adapter never creates them.
//! Each operation reads, parses, mutates and rewrites the full document.

use super::{into_record, settle, Datastore};
use crate::error::{json_type_name, DatastoreError};
use crate::id::create_id;
use crate::record::{self, Record};
use crate::response::Envelope;
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

const BACKEND: &str = "json";

/// File-backed datastore.
///
/// Writers are serialized by an in-process mutex held across the whole
/// read-modify-write cycle. Separate instances over the same path, or other
/// processes, are not coordinated.
#[derive(Debug)]
pub struct JsonFileDatastore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileDatastore {
    /// Open an existing store file. Fails if the file is missing or is not a JSON object.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, DatastoreError> {
        let store = JsonFileDatastore {
            path: path.into(),
            write_lock: Mutex::new(()),
        };
        store.load().await?;
        tracing::info!(path = %store.path.display(), "json datastore opened");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Record, DatastoreError> {
        let content = fs::read_to_string(&self.path).await?;
        match serde_json::from_str::<Value>(&content)? {
            Value::Object(doc) => Ok(doc),
            other => Err(DatastoreError::Storage(format!(
                "{} must hold a JSON object, found {}",
                self.path.display(),
                json_type_name(&other)
            ))),
        }
    }

    /// Write to a sibling temp file, then rename over the target so readers never
    /// observe a partial document.
    async fn persist(&self, doc: Record) -> Result<(), DatastoreError> {
        let content = serde_json::to_string_pretty(&Value::Object(doc))?;
        let tmp = temp_path(&self.path);
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn try_add(
        &self,
        record: Value,
        collection: &str,
        custom_id: Option<&str>,
    ) -> Result<Record, DatastoreError> {
        let record = into_record(record)?;
        let _guard = self.write_lock.lock().await;
        let mut doc = self.load().await?;
        let id = create_id(custom_id);
        let record = record::stamp_new(record, &id, &record::now_iso());
        collection_mut(&mut doc, collection)?.insert(id, Value::Object(record.clone()));
        self.persist(doc).await?;
        Ok(record)
    }

    async fn try_find_one(&self, id: &str, collection: &str) -> Result<Record, DatastoreError> {
        let doc = self.load().await?;
        let found = collection_ref(&doc, collection)?
            .get(id)
            .ok_or_else(|| DatastoreError::record_not_found(collection, id))?;
        as_record(found)
    }

    async fn try_find_all(&self, collection: &str) -> Result<Vec<Record>, DatastoreError> {
        let doc = self.load().await?;
        collection_ref(&doc, collection)?
            .values()
            .map(as_record)
            .collect()
    }

    async fn try_update_one(
        &self,
        id: &str,
        partial: Value,
        collection: &str,
    ) -> Result<Record, DatastoreError> {
        let partial = into_record(partial)?;
        let _guard = self.write_lock.lock().await;
        let mut doc = self.load().await?;
        let updated = {
            let target = collection_mut(&mut doc, collection)?;
            let existing = match target.get_mut(id) {
                Some(Value::Object(existing)) => existing,
                Some(other) => return Err(not_a_record(other)),
                None => return Err(DatastoreError::record_not_found(collection, id)),
            };
            record::merge_update(existing, &partial, &record::now_iso());
            existing.clone()
        };
        self.persist(doc).await?;
        Ok(updated)
    }

    async fn try_remove_one(&self, id: &str, collection: &str) -> Result<(), DatastoreError> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.load().await?;
        collection_mut(&mut doc, collection)?
            .remove(id)
            .ok_or_else(|| DatastoreError::record_not_found(collection, id))?;
        self.persist(doc).await
    }

    async fn try_drop(&self, collection: &str) -> Result<(), DatastoreError> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.load().await?;
        doc.remove(collection)
            .ok_or_else(|| DatastoreError::collection_not_found(collection))?;
        self.persist(doc).await
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn collection_ref<'a>(doc: &'a Record, name: &str) -> Result<&'a Record, DatastoreError> {
    match doc.get(name) {
        Some(Value::Object(c)) => Ok(c),
        _ => Err(DatastoreError::collection_not_found(name)),
    }
}

fn collection_mut<'a>(doc: &'a mut Record, name: &str) -> Result<&'a mut Record, DatastoreError> {
    match doc.get_mut(name) {
        Some(Value::Object(c)) => Ok(c),
        _ => Err(DatastoreError::collection_not_found(name)),
    }
}

fn as_record(value: &Value) -> Result<Record, DatastoreError> {
    match value {
        Value::Object(r) => Ok(r.clone()),
        other => Err(not_a_record(other)),
    }
}

fn not_a_record(value: &Value) -> DatastoreError {
    DatastoreError::Storage(format!(
        "stored record must be an object, found {}",
        json_type_name(value)
    ))
}

#[async_trait]
impl Datastore for JsonFileDatastore {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn add(&self, record: Value, collection: &str, custom_id: Option<&str>) -> Envelope {
        tracing::debug!(path = %self.path.display(), collection = %collection, "add");
        settle(BACKEND, "add", collection, self.try_add(record, collection, custom_id).await)
    }

    async fn find_one(&self, id: &str, collection: &str) -> Envelope {
        settle(BACKEND, "find_one", collection, self.try_find_one(id, collection).await)
    }

    async fn find_all(&self, collection: &str) -> Envelope {
        settle(BACKEND, "find_all", collection, self.try_find_all(collection).await)
    }

    async fn update_one(&self, id: &str, partial: Value, collection: &str) -> Envelope {
        tracing::debug!(path = %self.path.display(), collection = %collection, id = %id, "update_one");
        settle(BACKEND, "update_one", collection, self.try_update_one(id, partial, collection).await)
    }

    async fn remove_one(&self, id: &str, collection: &str) -> Envelope {
        tracing::debug!(path = %self.path.display(), collection = %collection, id = %id, "remove_one");
        settle(BACKEND, "remove_one", collection, self.try_remove_one(id, collection).await)
    }

    async fn drop_collection(&self, collection: &str) -> Envelope {
        settle(BACKEND, "drop", collection, self.try_drop(collection).await)
    }

    async fn close(&self) -> Envelope {
        Envelope::empty()
    }
}
