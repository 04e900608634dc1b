use axum::{
    Router,
    routing::{get, post},
};

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().nest("/tenants/{tenant}", tenant_routes())
}

fn tenant_routes() -> Router<AppState> {
    Router::new()
        .nest("/designs", design_routes())
        .nest("/submissions", submission_routes())
}

fn design_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::design::list_designs).post(handlers::design::save_design),
        )
        .route(
            "/{id}",
            get(handlers::design::get_design).delete(handlers::design::delete_design),
        )
        .route("/{id}/versions", get(handlers::version::list_versions))
        .route(
            "/{id}/versions/{version}",
            get(handlers::version::get_version),
        )
}

fn submission_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::submission::submit))
        .route(
            "/{document_id}",
            get(handlers::submission::get_submission),
        )
}
