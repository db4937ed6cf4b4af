//! Datastore adapters: one CRUD contract over memory, a JSON file, and SQLite.
//!
//! Every operation resolves to an [`Envelope`]; failures never escape as `Err`.
//! Backends implement fallible `Result` internals and settle them through
//! [`settle`], which logs and converts.

mod json;
mod memory;
mod sqlite;

pub use json::JsonFileDatastore;
pub use memory::MemoryDatastore;
pub use sqlite::SqliteDatastore;

use crate::config::DatasourceConfig;
use crate::error::DatastoreError;
use crate::id;
use crate::record::Record;
use crate::response::Envelope;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Uniform CRUD contract over a named collection.
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Short backend name for logs and diagnostics.
    fn backend(&self) -> &'static str;

    /// Insert `record` (must be a JSON object) with system fields stamped.
    /// An existing record with the same `_id` is overwritten.
    async fn add(&self, record: Value, collection: &str, custom_id: Option<&str>) -> Envelope;

    async fn find_one(&self, id: &str, collection: &str) -> Envelope;

    /// All records of a collection, in no particular order.
    async fn find_all(&self, collection: &str) -> Envelope;

    /// Merge `partial` over the stored record and refresh `_lastModified`.
    /// Returns the updated record.
    async fn update_one(&self, id: &str, partial: Value, collection: &str) -> Envelope;

    async fn remove_one(&self, id: &str, collection: &str) -> Envelope;

    /// Remove a whole collection. Backends whose schema is managed by migrations
    /// answer with an unsupported-operation error.
    async fn drop_collection(&self, collection: &str) -> Envelope;

    /// Release held resources. Idempotent; always ok.
    async fn close(&self) -> Envelope;

    fn create_id(&self, custom_id: Option<&str>) -> String {
        id::create_id(custom_id)
    }
}

/// Build the backend named by `config`.
pub async fn connect(config: &DatasourceConfig) -> Result<Arc<dyn Datastore>, DatastoreError> {
    let store: Arc<dyn Datastore> = match config {
        DatasourceConfig::Memory { collections } => {
            Arc::new(MemoryDatastore::with_collections(collections.iter().cloned()))
        }
        DatasourceConfig::Json { file_path } => Arc::new(JsonFileDatastore::open(file_path).await?),
        DatasourceConfig::Sqlite {
            database_path,
            max_connections,
        } => Arc::new(SqliteDatastore::connect(database_path, *max_connections).await?),
    };
    tracing::info!(backend = store.backend(), "datastore ready");
    Ok(store)
}

/// Log a failed operation and convert its result into an envelope.
pub(crate) fn settle<T>(
    backend: &'static str,
    operation: &'static str,
    collection: &str,
    result: Result<T, DatastoreError>,
) -> Envelope
where
    Result<T, DatastoreError>: Into<Envelope>,
{
    if let Err(e) = &result {
        tracing::warn!(backend, operation, collection = %collection, error = %e, "datastore operation failed");
    }
    result.into()
}

/// Require a JSON object payload.
pub(crate) fn into_record(value: Value) -> Result<Record, DatastoreError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(DatastoreError::malformed(&other)),
    }
}
