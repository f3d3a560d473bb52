//! Intake error taxonomy and HTTP mapping.
//!
//! Every response body is `{ok:false, error}` (the web frontend keys off
//! `ok`), with the dual-channel failure additionally reporting each channel's
//! reason so an operator can diagnose which collaborator is down.

use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

pub type IntakeResult<T> = Result<T, IntakeError>;

/// Everything that can stop a submission short of delivery, plus the one
/// failure mode after it (all delivery channels down).
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("Method not allowed.")]
    MethodNotAllowed,

    #[error("Origin not allowed.")]
    OriginForbidden,

    #[error("Too many requests. Try again later.")]
    RateLimited,

    /// Unreadable, oversized, or non-JSON body.
    #[error("{0}")]
    InvalidPayload(String),

    /// Field-level validation failure; message names the failing rule.
    #[error("{0}")]
    Validation(String),

    /// The verification service rejected the token (submitter's fault).
    #[error("{0}")]
    VerificationRejected(String),

    /// The verification service itself failed (not the submitter's fault).
    #[error("Turnstile verification unavailable.")]
    VerificationUnavailable,

    /// Neither delivery channel accepted the lead.
    #[error("No lead delivery channel succeeded.")]
    DeliveryFailed {
        email: Option<String>,
        storage: Option<String>,
    },

    #[error("Not found.")]
    NotFound,

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntakeError {
    fn status_code(&self) -> StatusCode {
        match self {
            IntakeError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            IntakeError::OriginForbidden => StatusCode::FORBIDDEN,
            IntakeError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            IntakeError::InvalidPayload(_)
            | IntakeError::Validation(_)
            | IntakeError::VerificationRejected(_) => StatusCode::BAD_REQUEST,
            IntakeError::VerificationUnavailable => StatusCode::BAD_GATEWAY,
            IntakeError::DeliveryFailed { .. } => StatusCode::SERVICE_UNAVAILABLE,
            IntakeError::NotFound => StatusCode::NOT_FOUND,
            IntakeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> Value {
        match self {
            IntakeError::DeliveryFailed { email, storage } => json!({
                "ok": false,
                "error": self.to_string(),
                "email": email,
                "storage": storage,
            }),
            _ => json!({ "ok": false, "error": self.to_string() }),
        }
    }
}

impl IntoResponse for IntakeError {
    fn into_response(self) -> Response {
        json_response(self.status_code(), self.body())
    }
}

/// JSON response with the intake contract's headers.
pub fn json_response(status: StatusCode, body: Value) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_contract() {
        assert_eq!(IntakeError::MethodNotAllowed.status_code(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(IntakeError::OriginForbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(IntakeError::RateLimited.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            IntakeError::InvalidPayload("Invalid JSON payload.".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            IntakeError::VerificationRejected("bad token".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            IntakeError::VerificationUnavailable.status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            IntakeError::DeliveryFailed {
                email: None,
                storage: None
            }
            .status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn dual_failure_body_enumerates_both_channels() {
        let err = IntakeError::DeliveryFailed {
            email: Some("Resend error (500): boom".into()),
            storage: None,
        };
        let body = err.body();
        assert_eq!(body["ok"], json!(false));
        assert_eq!(body["error"], json!("No lead delivery channel succeeded."));
        assert_eq!(body["email"], json!("Resend error (500): boom"));
        assert_eq!(body["storage"], Value::Null);
    }

    #[test]
    fn validation_message_survives_verbatim() {
        let err = IntakeError::Validation("Missing required contact fields.".into());
        assert_eq!(err.body()["error"], json!("Missing required contact fields."));
    }
}
