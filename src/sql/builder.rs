//! Builds parameterized INSERT, SELECT, UPDATE, DELETE statements for one collection table.
//!
//! Table and column names come from callers and are interpolated into SQL text
//! (double-quoted); they must be operator-controlled, never raw user input.
//! Values are always bound as parameters.

use crate::record::{Record, ID_FIELD};
use serde_json::Value;

/// Quote identifier for SQLite.
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) {
        self.params.push(v);
    }
}

/// INSERT OR REPLACE with one column per record field, so a duplicate `_id` overwrites.
pub fn insert(table: &str, record: &Record) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::with_capacity(record.len());
    for (name, val) in record {
        cols.push(quoted(name));
        q.push_param(val.clone());
    }
    let placeholders = vec!["?"; cols.len()].join(", ");
    q.sql = format!(
        "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
        quoted(table),
        cols.join(", "),
        placeholders
    );
    q
}

/// UPDATE by `_id`: SET every column in `changes`. Caller strips immutable fields.
pub fn update(table: &str, id: &str, changes: &Record) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::with_capacity(changes.len());
    for (name, val) in changes {
        sets.push(format!("{} = ?", quoted(name)));
        q.push_param(val.clone());
    }
    q.push_param(Value::String(id.to_string()));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        quoted(table),
        sets.join(", "),
        quoted(ID_FIELD)
    );
    q
}

pub fn select_all(table: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!("SELECT * FROM {}", quoted(table));
    q
}

pub fn select_by_id(table: &str, id: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.push_param(Value::String(id.to_string()));
    q.sql = format!("SELECT * FROM {} WHERE {} = ?", quoted(table), quoted(ID_FIELD));
    q
}

/// DELETE by `_id`.
pub fn delete(table: &str, id: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.push_param(Value::String(id.to_string()));
    q.sql = format!("DELETE FROM {} WHERE {} = ?", quoted(table), quoted(ID_FIELD));
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn quoting_doubles_embedded_quotes() {
        assert_eq!(quoted("beers"), "\"beers\"");
        assert_eq!(quoted("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn insert_binds_every_field() {
        let q = insert("beers", &rec(json!({"_id": "a", "name": "IPA"})));
        assert_eq!(q.sql, "INSERT OR REPLACE INTO \"beers\" (\"_id\", \"name\") VALUES (?, ?)");
        assert_eq!(q.params, vec![json!("a"), json!("IPA")]);
    }

    #[test]
    fn update_binds_id_last() {
        let q = update("beers", "a", &rec(json!({"kind": "ale"})));
        assert_eq!(q.sql, "UPDATE \"beers\" SET \"kind\" = ? WHERE \"_id\" = ?");
        assert_eq!(q.params, vec![json!("ale"), json!("a")]);
    }

    #[test]
    fn select_and_delete_by_id() {
        let q = select_by_id("beers", "a");
        assert_eq!(q.sql, "SELECT * FROM \"beers\" WHERE \"_id\" = ?");
        let q = delete("beers", "a");
        assert_eq!(q.sql, "DELETE FROM \"beers\" WHERE \"_id\" = ?");
        assert_eq!(q.params, vec![json!("a")]);
        assert!(select_all("beers").params.is_empty());
    }
}
