//! API route handlers.
//!
//! - `leads`: the submission pipeline (the reason this service exists)
//! - `health`: liveness and readiness probes

pub mod health;
pub mod leads;

use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::error::{IntakeError, IntakeResult};

/// API version and base info (GET /, no auth).
pub async fn api_info() -> IntakeResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "Leadgate",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "/api/leads",
            "/health",
            "/ready"
        ]
    })))
}

/// 404 handler for undefined routes.
pub async fn not_found() -> IntakeError {
    IntakeError::NotFound
}
