//! Record shape and the system-managed fields every adapter stamps.

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

/// One stored entity: a JSON object keyed by field name.
pub type Record = Map<String, Value>;

pub const ID_FIELD: &str = "_id";
pub const CREATED_AT_FIELD: &str = "_createdAt";
pub const LAST_MODIFIED_FIELD: &str = "_lastModified";

/// Current UTC time as ISO-8601 with millisecond precision, e.g. `2026-01-01T00:00:00.000Z`.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Stamp system fields onto a new record. Caller fields are kept; a caller-supplied
/// `_id`/`_createdAt`/`_lastModified` is replaced.
pub fn stamp_new(mut record: Record, id: &str, now: &str) -> Record {
    record.insert(ID_FIELD.into(), Value::String(id.to_string()));
    record.insert(CREATED_AT_FIELD.into(), Value::String(now.to_string()));
    record.insert(LAST_MODIFIED_FIELD.into(), Value::Null);
    record
}

/// Merge `partial` over `existing`. `_id` and `_createdAt` are immutable;
/// `_lastModified` is always set to `now`.
pub fn merge_update(existing: &mut Record, partial: &Record, now: &str) {
    for (k, v) in partial {
        if is_immutable(k) {
            continue;
        }
        existing.insert(k.clone(), v.clone());
    }
    existing.insert(LAST_MODIFIED_FIELD.into(), Value::String(now.to_string()));
}

/// Fields that `update_one` never writes from caller input.
pub fn is_immutable(field: &str) -> bool {
    field == ID_FIELD || field == CREATED_AT_FIELD
}
