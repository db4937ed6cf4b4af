//! Error types for the datastores, configuration and the HTTP layer.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Failure classes surfaced through the envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedInput,
    CollectionNotFound,
    RecordNotFound,
    StorageEngineFailure,
    Unsupported,
}

impl ErrorKind {
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::MalformedInput => StatusCode::BAD_REQUEST,
            ErrorKind::CollectionNotFound | ErrorKind::RecordNotFound => StatusCode::NOT_FOUND,
            ErrorKind::Unsupported => StatusCode::NOT_IMPLEMENTED,
            ErrorKind::StorageEngineFailure => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Adapter-internal errors. Never returned to callers directly; converted into an
/// [`Envelope`](crate::response::Envelope) at the trait boundary.
#[derive(Error, Debug)]
pub enum DatastoreError {
    #[error("Malformed record. Record should be of type [Object] but is {found} instead.")]
    MalformedInput { found: &'static str },
    #[error("Collection ({collection}) does NOT exist.")]
    CollectionNotFound { collection: String },
    #[error("Collection ({collection}) or record _id ({id}) does NOT exist.")]
    RecordNotFound { collection: String, id: String },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("storage: {0}")]
    Storage(String),
    #[error("{operation} is not supported by the {backend} datastore")]
    Unsupported {
        operation: &'static str,
        backend: &'static str,
    },
}

impl DatastoreError {
    pub fn collection_not_found(collection: &str) -> Self {
        DatastoreError::CollectionNotFound {
            collection: collection.to_string(),
        }
    }

    pub fn record_not_found(collection: &str, id: &str) -> Self {
        DatastoreError::RecordNotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    /// Malformed-input error naming the JSON type that was supplied.
    pub fn malformed(value: &serde_json::Value) -> Self {
        DatastoreError::MalformedInput {
            found: json_type_name(value),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DatastoreError::MalformedInput { .. } => ErrorKind::MalformedInput,
            DatastoreError::CollectionNotFound { .. } => ErrorKind::CollectionNotFound,
            DatastoreError::RecordNotFound { .. } => ErrorKind::RecordNotFound,
            DatastoreError::Io(_)
            | DatastoreError::Json(_)
            | DatastoreError::Db(_)
            | DatastoreError::Storage(_) => ErrorKind::StorageEngineFailure,
            DatastoreError::Unsupported { .. } => ErrorKind::Unsupported,
        }
    }
}

pub(crate) fn json_type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot load config: {0}")]
    Load(String),
    #[error("invalid config: {0}")]
    Validation(String),
    #[error("missing variable: {0}")]
    MissingVariable(&'static str),
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Request-level failures raised before the datastore is reached.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation: {0}")]
    Validation(String),
    #[error("unreadable body: {0}")]
    Body(#[from] JsonRejection),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::Body(rejection) => (rejection.status(), "invalid_body"),
        }
    }
}

/// `{"error": {"code", "message"}}`
#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    code: &'a str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn malformed_names_the_supplied_type() {
        let err = DatastoreError::malformed(&json!(2));
        assert_eq!(
            err.to_string(),
            "Malformed record. Record should be of type [Object] but is number instead."
        );
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }

    #[test]
    fn engine_failures_share_one_kind() {
        let io = DatastoreError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(io.kind(), ErrorKind::StorageEngineFailure);
        assert_eq!(DatastoreError::Storage("x".into()).kind(), ErrorKind::StorageEngineFailure);
    }

    #[test]
    fn record_not_found_names_collection_and_id() {
        let msg = DatastoreError::record_not_found("beers", "abc").to_string();
        assert!(msg.contains("beers"));
        assert!(msg.contains("abc"));
    }

    #[test]
    fn validation_error_renders_code_and_message() {
        let resp = AppError::Validation("name is required".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn kinds_map_to_http_statuses() {
        assert_eq!(ErrorKind::MalformedInput.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorKind::RecordNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorKind::Unsupported.status_code(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(
            ErrorKind::StorageEngineFailure.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
