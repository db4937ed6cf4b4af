//! Collection CRUD routes. The first path segment names the collection; handlers
//! pass it straight to the datastore.

use crate::handlers::collection::{create, delete as delete_handler, list, read, update};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn collection_routes(state: AppState) -> Router {
    Router::new()
        .route("/:collection", get(list).post(create))
        .route(
            "/:collection/:id",
            get(read).patch(update).put(update).delete(delete_handler),
        )
        .with_state(state)
}
