//! Standard result envelope returned by every datastore operation.

use crate::error::{DatastoreError, ErrorKind};
use crate::record::Record;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

/// `{ data, status, message, error }`. `error` is true iff `status` is `"error"`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub data: Vec<Record>,
    pub status: Status,
    pub message: Option<String>,
    pub error: bool,
    /// Failure class, kept off the wire; used for HTTP status mapping.
    #[serde(skip)]
    pub kind: Option<ErrorKind>,
}

impl Envelope {
    pub fn ok(data: Vec<Record>) -> Self {
        Envelope {
            data,
            status: Status::Ok,
            message: None,
            error: false,
            kind: None,
        }
    }

    pub fn ok_one(record: Record) -> Self {
        Self::ok(vec![record])
    }

    pub fn empty() -> Self {
        Self::ok(Vec::new())
    }

    pub fn failure(err: &DatastoreError) -> Self {
        Envelope {
            data: Vec::new(),
            status: Status::Error,
            message: Some(err.to_string()),
            error: true,
            kind: Some(err.kind()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    /// First record in `data`, if any.
    pub fn first(&self) -> Option<&Record> {
        self.data.first()
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind {
            None => StatusCode::OK,
            Some(kind) => kind.status_code(),
        }
    }
}

impl From<Result<Vec<Record>, DatastoreError>> for Envelope {
    fn from(result: Result<Vec<Record>, DatastoreError>) -> Self {
        match result {
            Ok(data) => Envelope::ok(data),
            Err(e) => Envelope::failure(&e),
        }
    }
}

impl From<Result<Record, DatastoreError>> for Envelope {
    fn from(result: Result<Record, DatastoreError>) -> Self {
        result.map(|r| vec![r]).into()
    }
}

impl From<Result<(), DatastoreError>> for Envelope {
    fn from(result: Result<(), DatastoreError>) -> Self {
        result.map(|()| Vec::new()).into()
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ok_serializes_four_fields() {
        let env = Envelope::empty();
        let v = serde_json::to_value(&env).unwrap();
        assert_eq!(v, json!({"data": [], "status": "ok", "message": null, "error": false}));
    }

    #[test]
    fn failure_carries_message_and_kind() {
        let env = Envelope::failure(&DatastoreError::collection_not_found("nope"));
        assert!(env.error);
        assert_eq!(env.status, Status::Error);
        assert!(env.data.is_empty());
        assert_eq!(env.message.as_deref(), Some("Collection (nope) does NOT exist."));
        assert_eq!(env.status_code(), StatusCode::NOT_FOUND);

        let v = serde_json::to_value(&env).unwrap();
        assert_eq!(v.as_object().unwrap().len(), 4);
    }

    #[test]
    fn unit_result_becomes_empty_ok() {
        let env: Envelope = Ok::<(), DatastoreError>(()).into();
        assert!(env.is_ok());
        assert!(env.data.is_empty());
        assert!(env.message.is_none());
    }
}
