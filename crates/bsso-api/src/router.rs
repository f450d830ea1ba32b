use axum::{Router, http::StatusCode, response::IntoResponse, routing::get};

use crate::{auth, providers, state::ApiState};

/// Build the application router. Called once by the host binary.
pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/health", get(health))
        .merge(auth::routes())
        .merge(providers::routes())
        .fallback(handler_404)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn handler_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        "The requested resource was not found",
    )
}
