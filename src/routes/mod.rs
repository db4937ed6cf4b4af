//! Router assembly.

mod collection;
mod common;

pub use collection::collection_routes;
pub use common::common_routes;

use crate::config::ServiceConfig;
use crate::handlers::collection::not_found;
use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Full service: common routes at the root, collection routes under `base_path`,
/// JSON 404 fallback, request tracing, permissive CORS and a body size limit.
///
/// With `base_path = "/"`, a collection named `health` or `version` is shadowed
/// by the common routes.
pub fn service_router(state: AppState, config: &ServiceConfig) -> Router {
    let common = common_routes(state.clone());
    let collections = collection_routes(state);
    let base = config.base_path.trim_end_matches('/');
    let api = if base.is_empty() {
        collections
    } else {
        Router::new().nest(base, collections)
    };
    Router::new()
        .merge(common)
        .merge(api)
        .fallback(not_found)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.body_limit_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
