//! Service welcome and health endpoints.

use crate::api::models::MessageResponse;
use axum::Json;
use serde_json::{Value, json};

/// Welcome message
#[utoipa::path(
    get,
    path = "/",
    tag = "service",
    responses(
        (status = 200, description = "Welcome message", body = MessageResponse),
    )
)]
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse::new("Welcome to the Darati API"))
}

/// Health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "service",
    responses(
        (status = 200, description = "Service is healthy"),
    )
)]
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Liveness probe
pub async fn healthz() -> &'static str {
    "OK"
}
