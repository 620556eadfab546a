pub mod health;
pub mod upload;

use axum::{routing::get, routing::post, Router};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/resumes/upload", post(upload::handle_upload))
        .route(
            "/api/v1/resumes/upload/stream",
            post(upload::handle_upload_stream),
        )
        .with_state(state)
}
