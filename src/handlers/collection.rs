//! Collection CRUD handlers: each request maps to one datastore call and answers with its envelope.

use crate::error::AppError;
use crate::response::Envelope;
use crate::service::RequestValidator;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
pub struct CreateParams {
    /// Caller-chosen `_id` for the new record.
    pub id: Option<String>,
}

pub async fn list(State(state): State<AppState>, Path(collection): Path<String>) -> Envelope {
    state.store.find_all(&collection).await
}

pub async fn create(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Query(params): Query<CreateParams>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(body) = body?;
    // non-object bodies fall through so the store reports them as malformed
    if let (Some(rules), Value::Object(map)) = (state.rules_for(&collection), &body) {
        RequestValidator::validate(map, rules)?;
    }
    let envelope = state
        .store
        .add(body, &collection, params.id.as_deref())
        .await;
    if envelope.is_ok() {
        return Ok((StatusCode::CREATED, Json(envelope)).into_response());
    }
    Ok(envelope.into_response())
}

pub async fn read(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Envelope {
    state.store.find_one(&id, &collection).await
}

pub async fn update(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Envelope, AppError> {
    let Json(body) = body?;
    if let (Some(rules), Value::Object(map)) = (state.rules_for(&collection), &body) {
        RequestValidator::validate_partial(map, rules)?;
    }
    Ok(state.store.update_one(&id, body, &collection).await)
}

pub async fn delete(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Envelope {
    state.store.remove_one(&id, &collection).await
}

/// Fallback for unmatched routes.
pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "status": 404, "error": "Not found" })),
    )
}
