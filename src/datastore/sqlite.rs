//! SQLite datastore: one table per collection, accessed through an sqlx pool.
//!
//! Tables are created by migrations outside this crate. Records map onto
//! columns by field name. Nested objects and arrays are stored as JSON text and
//! read back as that text; text cells are never reinterpreted.

use super::{into_record, settle, Datastore};
use crate::error::DatastoreError;
use crate::id::create_id;
use crate::record::{self, Record, LAST_MODIFIED_FIELD};
use crate::response::Envelope;
use crate::sql::{self, QueryBuf, SqliteBindValue};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteQueryResult, SqliteRow};
use std::str::FromStr;

const BACKEND: &str = "sqlite";
const MEMORY_PATH: &str = ":memory:";

#[derive(Debug, Clone)]
pub struct SqliteDatastore {
    pool: SqlitePool,
}

impl SqliteDatastore {
    /// Connect to `database_path`: a file path (created if missing), `:memory:`,
    /// or a full `sqlite:` URL. In-memory databases are pinned to a single
    /// connection that never idles out, since each connection would otherwise
    /// see its own empty database.
    pub async fn connect(database_path: &str, max_connections: u32) -> Result<Self, DatastoreError> {
        let (options, in_memory) = connect_options(database_path)?;
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };
        let pool = pool_options.connect_with(options).await?;
        tracing::info!(database = %database_path, "sqlite datastore connected");
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        SqliteDatastore { pool }
    }

    /// Underlying pool, e.g. for running migrations.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn execute(&self, q: &QueryBuf) -> Result<SqliteQueryResult, sqlx::Error> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(SqliteBindValue::from_json(p));
        }
        query.execute(&self.pool).await
    }

    async fn fetch_optional(&self, q: &QueryBuf) -> Result<Option<SqliteRow>, sqlx::Error> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(SqliteBindValue::from_json(p));
        }
        query.fetch_optional(&self.pool).await
    }

    async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<SqliteRow>, sqlx::Error> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(SqliteBindValue::from_json(p));
        }
        query.fetch_all(&self.pool).await
    }

    async fn try_add(
        &self,
        record: Value,
        table: &str,
        custom_id: Option<&str>,
    ) -> Result<Record, DatastoreError> {
        let record = into_record(record)?;
        let id = create_id(custom_id);
        let record = record::stamp_new(record, &id, &record::now_iso());
        self.execute(&sql::insert(table, &record))
            .await
            .map_err(|e| classify(e, table))?;
        Ok(record)
    }

    async fn try_find_one(&self, id: &str, table: &str) -> Result<Record, DatastoreError> {
        let row = self
            .fetch_optional(&sql::select_by_id(table, id))
            .await
            .map_err(|e| classify(e, table))?
            .ok_or_else(|| DatastoreError::record_not_found(table, id))?;
        Ok(row_to_record(&row))
    }

    async fn try_find_all(&self, table: &str) -> Result<Vec<Record>, DatastoreError> {
        let rows = self
            .fetch_all(&sql::select_all(table))
            .await
            .map_err(|e| classify(e, table))?;
        Ok(rows.iter().map(row_to_record).collect())
    }

    /// UPDATE then re-read, so callers get the merged row like the other backends.
    async fn try_update_one(
        &self,
        id: &str,
        partial: Value,
        table: &str,
    ) -> Result<Record, DatastoreError> {
        let partial = into_record(partial)?;
        let mut changes: Record = partial
            .into_iter()
            .filter(|(k, _)| !record::is_immutable(k))
            .collect();
        changes.insert(LAST_MODIFIED_FIELD.into(), Value::String(record::now_iso()));
        let result = self
            .execute(&sql::update(table, id, &changes))
            .await
            .map_err(|e| classify(e, table))?;
        if result.rows_affected() == 0 {
            return Err(DatastoreError::record_not_found(table, id));
        }
        self.try_find_one(id, table).await
    }

    async fn try_remove_one(&self, id: &str, table: &str) -> Result<(), DatastoreError> {
        let result = self
            .execute(&sql::delete(table, id))
            .await
            .map_err(|e| classify(e, table))?;
        if result.rows_affected() == 0 {
            return Err(DatastoreError::record_not_found(table, id));
        }
        Ok(())
    }
}

fn connect_options(database_path: &str) -> Result<(SqliteConnectOptions, bool), DatastoreError> {
    if database_path == MEMORY_PATH {
        return Ok((SqliteConnectOptions::from_str("sqlite::memory:")?, true));
    }
    if database_path.starts_with("sqlite:") {
        let in_memory = database_path.contains(MEMORY_PATH) || database_path.contains("mode=memory");
        return Ok((SqliteConnectOptions::from_str(database_path)?, in_memory));
    }
    Ok((
        SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true),
        false,
    ))
}

/// Missing tables surface as `CollectionNotFound`; anything else is an engine failure.
fn classify(err: sqlx::Error, table: &str) -> DatastoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.message().starts_with("no such table") {
            return DatastoreError::collection_not_found(table);
        }
    }
    DatastoreError::Db(err)
}

fn row_to_record(row: &SqliteRow) -> Record {
    use sqlx::{Column, Row};
    let mut map = Record::new();
    for col in row.columns() {
        map.insert(col.name().to_string(), cell_to_value(row, col.ordinal()));
    }
    map
}

fn cell_to_value(row: &SqliteRow, idx: usize) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(idx) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(idx) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(idx) {
        return Value::String(s);
    }
    if let Ok(Some(b)) = row.try_get::<Option<Vec<u8>>, _>(idx) {
        return Value::String(String::from_utf8_lossy(&b).into_owned());
    }
    Value::Null
}

#[async_trait]
impl Datastore for SqliteDatastore {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn add(&self, record: Value, collection: &str, custom_id: Option<&str>) -> Envelope {
        settle(BACKEND, "add", collection, self.try_add(record, collection, custom_id).await)
    }

    async fn find_one(&self, id: &str, collection: &str) -> Envelope {
        settle(BACKEND, "find_one", collection, self.try_find_one(id, collection).await)
    }

    async fn find_all(&self, collection: &str) -> Envelope {
        settle(BACKEND, "find_all", collection, self.try_find_all(collection).await)
    }

    async fn update_one(&self, id: &str, partial: Value, collection: &str) -> Envelope {
        settle(BACKEND, "update_one", collection, self.try_update_one(id, partial, collection).await)
    }

    async fn remove_one(&self, id: &str, collection: &str) -> Envelope {
        settle(BACKEND, "remove_one", collection, self.try_remove_one(id, collection).await)
    }

    /// Tables are dropped by migrations, not at runtime.
    async fn drop_collection(&self, collection: &str) -> Envelope {
        let result: Result<(), DatastoreError> = Err(DatastoreError::Unsupported {
            operation: "drop",
            backend: BACKEND,
        });
        settle(BACKEND, "drop", collection, result)
    }

    async fn close(&self) -> Envelope {
        if !self.pool.is_closed() {
            self.pool.close().await;
            tracing::info!("sqlite datastore closed");
        }
        Envelope::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;
    use tempfile::TempDir;

    const BEERS_DDL: &str = r#"
        CREATE TABLE beers (
            _id TEXT PRIMARY KEY,
            _createdAt TEXT NOT NULL,
            _lastModified TEXT,
            name TEXT,
            kind TEXT,
            abv REAL,
            tags TEXT
        )
    "#;

    async fn store() -> (TempDir, SqliteDatastore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("default.db");
        let store = SqliteDatastore::connect(path.to_str().unwrap(), 2).await.unwrap();
        sqlx::query(BEERS_DDL).execute(store.pool()).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_add_and_find_one_round_trip() {
        let (_dir, store) = store().await;
        let env = store
            .add(json!({"name": "IPA", "kind": "ale", "abv": 6.5}), "beers", None)
            .await;
        assert!(env.is_ok(), "{:?}", env.message);
        let id = env.first().unwrap()["_id"].as_str().unwrap().to_string();

        let found = store.find_one(&id, "beers").await;
        let rec = found.first().unwrap();
        assert_eq!(rec["name"], "IPA");
        assert_eq!(rec["abv"], 6.5);
        assert!(rec["_lastModified"].is_null());
        // columns without a value come back as null
        assert!(rec["tags"].is_null());
    }

    #[tokio::test]
    async fn test_unknown_column_is_engine_failure() {
        let (_dir, store) = store().await;
        let env = store
            .add(json!({"foo": "bar", "pickles": false}), "beers", None)
            .await;
        assert!(env.error);
        assert_eq!(env.kind, Some(ErrorKind::StorageEngineFailure));
        assert!(env.message.is_some());
    }

    #[tokio::test]
    async fn test_missing_table_is_collection_not_found() {
        let (_dir, store) = store().await;
        let env = store.find_all("doesnt_exist").await;
        assert_eq!(env.kind, Some(ErrorKind::CollectionNotFound));
        assert!(env.data.is_empty());
    }

    #[tokio::test]
    async fn test_update_returns_reread_row() {
        let (_dir, store) = store().await;
        store.add(json!({"name": "X"}), "beers", Some("k")).await;
        let env = store.update_one("k", json!({"kind": "ale"}), "beers").await;
        let rec = env.first().unwrap();
        assert_eq!(rec["name"], "X");
        assert_eq!(rec["kind"], "ale");
        assert!(rec["_lastModified"].is_string());
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_record_not_found() {
        let (_dir, store) = store().await;
        let env = store.update_one("ghost", json!({"kind": "ale"}), "beers").await;
        assert_eq!(env.kind, Some(ErrorKind::RecordNotFound));
    }

    #[tokio::test]
    async fn test_nested_values_are_stored_as_json_text() {
        let (_dir, store) = store().await;
        store
            .add(json!({"name": "Sour", "tags": ["tart", "fruity"]}), "beers", Some("s"))
            .await;
        let rec = store.find_one("s", "beers").await.data.remove(0);
        let tags: Value = serde_json::from_str(rec["tags"].as_str().unwrap()).unwrap();
        assert_eq!(tags, json!(["tart", "fruity"]));
    }

    #[tokio::test]
    async fn test_json_looking_strings_come_back_verbatim() {
        let (_dir, store) = store().await;
        let env = store
            .add(json!({"name": "{\"x\":1}", "kind": "[1,2]", "abv": 1.5}), "beers", Some("k"))
            .await;
        assert!(env.is_ok(), "{:?}", env.message);
        let rec = store.find_one("k", "beers").await.data.remove(0);
        assert_eq!(rec["name"], json!("{\"x\":1}"));
        assert_eq!(rec["kind"], json!("[1,2]"));
        assert_eq!(rec["abv"], 1.5);
    }

    #[tokio::test]
    async fn test_duplicate_id_overwrites() {
        let (_dir, store) = store().await;
        store.add(json!({"name": "one"}), "beers", Some("dup")).await;
        store.add(json!({"name": "two"}), "beers", Some("dup")).await;
        let all = store.find_all("beers").await;
        assert_eq!(all.data.len(), 1);
        assert_eq!(all.data[0]["name"], "two");
    }

    #[tokio::test]
    async fn test_drop_is_unsupported() {
        let (_dir, store) = store().await;
        let env = store.drop_collection("beers").await;
        assert!(env.error);
        assert_eq!(env.kind, Some(ErrorKind::Unsupported));
        // table is untouched
        assert!(store.find_all("beers").await.is_ok());
    }

    #[tokio::test]
    async fn test_operations_after_close_fail_cleanly() {
        let (_dir, store) = store().await;
        assert!(store.close().await.is_ok());
        assert!(store.close().await.is_ok());
        let env = store.find_all("beers").await;
        assert!(env.error);
        assert_eq!(env.kind, Some(ErrorKind::StorageEngineFailure));
    }

    #[tokio::test]
    async fn test_in_memory_database_keeps_state() {
        let store = SqliteDatastore::connect(":memory:", 5).await.unwrap();
        sqlx::query(BEERS_DDL).execute(store.pool()).await.unwrap();
        store.add(json!({"name": "IPA"}), "beers", Some("m")).await;
        assert!(store.find_one("m", "beers").await.is_ok());
    }
}
