//! Liveness endpoint.

use axum::{Json, Router, http::StatusCode, response::IntoResponse, routing::get};

pub fn router() -> Router {
    Router::new().route("/", get(healthcheck))
}

async fn healthcheck() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "message": "Server is running" })),
    )
}
