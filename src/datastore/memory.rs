//! Volatile datastore: collections live in process memory and vanish with the instance.

use super::{into_record, settle, Datastore};
use crate::error::DatastoreError;
use crate::id::create_id;
use crate::record::{self, Record};
use crate::response::Envelope;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

const BACKEND: &str = "memory";

type Collections = HashMap<String, HashMap<String, Record>>;

/// In-memory datastore. Each instance owns its collections; nothing is shared
/// between instances.
#[derive(Debug, Default)]
pub struct MemoryDatastore {
    collections: RwLock<Collections>,
}

impl MemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with the given (empty) collections.
    pub fn with_collections<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let collections = names
            .into_iter()
            .map(|n| (n.into(), HashMap::new()))
            .collect();
        MemoryDatastore {
            collections: RwLock::new(collections),
        }
    }

    /// Create an empty collection if it is not already present.
    pub async fn create_collection(&self, name: &str) {
        self.collections
            .write()
            .await
            .entry(name.to_string())
            .or_default();
    }

    async fn try_add(
        &self,
        record: Value,
        collection: &str,
        custom_id: Option<&str>,
    ) -> Result<Record, DatastoreError> {
        let record = into_record(record)?;
        let mut guard = self.collections.write().await;
        let target = existing_mut(&mut guard, collection)?;
        let id = create_id(custom_id);
        let record = record::stamp_new(record, &id, &record::now_iso());
        target.insert(id, record.clone());
        Ok(record)
    }

    async fn try_find_one(&self, id: &str, collection: &str) -> Result<Record, DatastoreError> {
        let guard = self.collections.read().await;
        existing(&guard, collection)?
            .get(id)
            .cloned()
            .ok_or_else(|| DatastoreError::record_not_found(collection, id))
    }

    async fn try_find_all(&self, collection: &str) -> Result<Vec<Record>, DatastoreError> {
        let guard = self.collections.read().await;
        Ok(existing(&guard, collection)?.values().cloned().collect())
    }

    async fn try_update_one(
        &self,
        id: &str,
        partial: Value,
        collection: &str,
    ) -> Result<Record, DatastoreError> {
        let partial = into_record(partial)?;
        let mut guard = self.collections.write().await;
        let stored = existing_mut(&mut guard, collection)?
            .get_mut(id)
            .ok_or_else(|| DatastoreError::record_not_found(collection, id))?;
        record::merge_update(stored, &partial, &record::now_iso());
        Ok(stored.clone())
    }

    async fn try_remove_one(&self, id: &str, collection: &str) -> Result<(), DatastoreError> {
        let mut guard = self.collections.write().await;
        existing_mut(&mut guard, collection)?
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| DatastoreError::record_not_found(collection, id))
    }

    async fn try_drop(&self, collection: &str) -> Result<(), DatastoreError> {
        self.collections
            .write()
            .await
            .remove(collection)
            .map(|_| ())
            .ok_or_else(|| DatastoreError::collection_not_found(collection))
    }
}

fn existing<'a>(
    collections: &'a Collections,
    name: &str,
) -> Result<&'a HashMap<String, Record>, DatastoreError> {
    collections
        .get(name)
        .ok_or_else(|| DatastoreError::collection_not_found(name))
}

fn existing_mut<'a>(
    collections: &'a mut Collections,
    name: &str,
) -> Result<&'a mut HashMap<String, Record>, DatastoreError> {
    collections
        .get_mut(name)
        .ok_or_else(|| DatastoreError::collection_not_found(name))
}

#[async_trait]
impl Datastore for MemoryDatastore {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn add(&self, record: Value, collection: &str, custom_id: Option<&str>) -> Envelope {
        tracing::debug!(collection = %collection, "add");
        settle(BACKEND, "add", collection, self.try_add(record, collection, custom_id).await)
    }

    async fn find_one(&self, id: &str, collection: &str) -> Envelope {
        settle(BACKEND, "find_one", collection, self.try_find_one(id, collection).await)
    }

    async fn find_all(&self, collection: &str) -> Envelope {
        settle(BACKEND, "find_all", collection, self.try_find_all(collection).await)
    }

    async fn update_one(&self, id: &str, partial: Value, collection: &str) -> Envelope {
        tracing::debug!(collection = %collection, id = %id, "update_one");
        settle(BACKEND, "update_one", collection, self.try_update_one(id, partial, collection).await)
    }

    async fn remove_one(&self, id: &str, collection: &str) -> Envelope {
        tracing::debug!(collection = %collection, id = %id, "remove_one");
        settle(BACKEND, "remove_one", collection, self.try_remove_one(id, collection).await)
    }

    async fn drop_collection(&self, collection: &str) -> Envelope {
        settle(BACKEND, "drop", collection, self.try_drop(collection).await)
    }

    async fn close(&self) -> Envelope {
        // no connection to release
        Envelope::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn store() -> MemoryDatastore {
        MemoryDatastore::with_collections(["default", "widgets"])
    }

    #[tokio::test]
    async fn test_add_and_find_one() {
        let store = store();
        let added = store.add(json!({"name": "IPA"}), "default", None).await;
        assert!(added.is_ok());
        let id = added.first().unwrap()["_id"].as_str().unwrap().to_string();

        let found = store.find_one(&id, "default").await;
        assert_eq!(found.first().unwrap()["name"], "IPA");
    }

    #[tokio::test]
    async fn test_add_does_not_create_collections() {
        let store = store();
        let env = store.add(json!({"a": 1}), "nope", None).await;
        assert!(env.error);
        assert_eq!(env.kind, Some(ErrorKind::CollectionNotFound));
        assert!(store.find_all("nope").await.error);
    }

    #[tokio::test]
    async fn test_duplicate_custom_id_overwrites() {
        let store = store();
        store.add(json!({"v": 1}), "default", Some("dup")).await;
        store.add(json!({"v": 2}), "default", Some("dup")).await;

        let all = store.find_all("default").await;
        assert_eq!(all.data.len(), 1);
        assert_eq!(all.data[0]["v"], 2);
    }

    #[tokio::test]
    async fn test_instances_do_not_share_state() {
        let a = store();
        let b = store();
        a.add(json!({"x": 1}), "default", Some("only-a")).await;
        assert!(b.find_one("only-a", "default").await.error);
    }

    #[tokio::test]
    async fn test_drop_then_drop_again() {
        let store = store();
        assert!(store.drop_collection("widgets").await.is_ok());
        let again = store.drop_collection("widgets").await;
        assert_eq!(again.kind, Some(ErrorKind::CollectionNotFound));
    }

    #[tokio::test]
    async fn test_create_collection_is_idempotent() {
        let store = MemoryDatastore::new();
        store.create_collection("beers").await;
        store.add(json!({"n": 1}), "beers", Some("k")).await;
        store.create_collection("beers").await;
        assert_eq!(store.find_all("beers").await.data.len(), 1);
    }

    #[tokio::test]
    async fn test_update_rejects_non_object() {
        let store = store();
        store.add(json!({"n": 1}), "default", Some("k")).await;
        let env = store.update_one("k", json!("nope"), "default").await;
        assert_eq!(env.kind, Some(ErrorKind::MalformedInput));
    }

    #[tokio::test]
    async fn test_missing_collection_wins_over_missing_id() {
        let store = store();
        for env in [
            store.find_one("k", "nope").await,
            store.update_one("k", json!({"n": 2}), "nope").await,
            store.remove_one("k", "nope").await,
        ] {
            assert_eq!(env.kind, Some(ErrorKind::CollectionNotFound));
            assert_eq!(env.message.as_deref(), Some("Collection (nope) does NOT exist."));
        }
        assert_eq!(
            store.find_one("k", "default").await.kind,
            Some(ErrorKind::RecordNotFound)
        );
    }
}
