//! The lead submission pipeline.
//!
//! Linear: read body → honeypot trap → validate → verify → deliver. The
//! origin and rate-limit gates already ran in middleware by the time this
//! handler sees the request. Nothing here panics; every external failure is
//! folded into a typed [`IntakeError`].

use std::sync::Arc;

use axum::body::to_bytes;
use axum::extract::{Request, State};
use axum::http::header::USER_AGENT;
use axum::http::StatusCode;
use axum::response::Response;
use serde_json::{json, Map, Value};

use crate::deliver::deliver_all;
use crate::error::{json_response, IntakeError, IntakeResult};
use crate::lead::{build_context, clean_text, clean_value, validate_lead, MAX_BODY_BYTES};
use crate::middleware::ClientIp;
use crate::state::AppState;
use crate::verify::VerifyOutcome;

/// Pre-flight probe: empty success.
pub async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// POST /api/leads
pub async fn submit_lead(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> IntakeResult<Response> {
    let (parts, body) = request.into_parts();

    let ip = parts
        .extensions
        .get::<ClientIp>()
        .cloned()
        .unwrap_or_default()
        .0;
    let user_agent = parts
        .headers
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(|value| clean_text(value, 400))
        .unwrap_or_default();

    // Streaming read with a hard ceiling; anything past it is rejected
    // without buffering the rest. A transport failure mid-read is not the
    // caller's fault and gets its own message.
    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            let message = if exceeded_length_limit(&err) {
                "Payload too large."
            } else {
                "Failed to read request body."
            };
            return Err(IntakeError::InvalidPayload(message.to_string()));
        }
    };

    let payload: Value = if bytes.is_empty() {
        Value::Object(Map::new())
    } else {
        serde_json::from_slice(&bytes)
            .map_err(|_| IntakeError::InvalidPayload("Invalid JSON payload.".to_string()))?
    };

    // Silent bot trap: report success, deliver nothing.
    let honeypot = clean_value(payload.get("honeypot"), 200);
    if !honeypot.is_empty() {
        tracing::info!(ip = %ip, "Honeypot tripped, ignoring submission");
        return Ok(json_response(
            StatusCode::OK,
            json!({ "ok": true, "delivered": false, "ignored": true }),
        ));
    }

    let lead = validate_lead(&payload).map_err(IntakeError::Validation)?;

    let token = clean_value(payload.get("turnstileToken"), 5000);
    match state.verifier.verify(&token, &ip).await {
        VerifyOutcome::Passed | VerifyOutcome::Skipped => {}
        VerifyOutcome::Rejected(reason) => return Err(IntakeError::VerificationRejected(reason)),
        VerifyOutcome::Unavailable(detail) => {
            tracing::error!(detail = %detail, "Verification service unreachable");
            return Err(IntakeError::VerificationUnavailable);
        }
    }

    let ctx = build_context(&payload, user_agent, ip);
    let report = deliver_all(state.email.as_ref(), state.storage.as_ref(), &lead, &ctx).await;

    if !report.delivered() {
        return Err(IntakeError::DeliveryFailed {
            email: report.email.reason,
            storage: report.storage.reason,
        });
    }

    Ok(json_response(
        StatusCode::OK,
        json!({
            "ok": true,
            "delivered": true,
            "emailDelivered": report.email.ok,
            "stored": report.storage.ok,
        }),
    ))
}

/// Whether a body-read error came from the size ceiling rather than the
/// transport. The limit error sits somewhere in the source chain.
fn exceeded_length_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(inner) = source {
        if inner.is::<http_body_util::LengthLimitError>() {
            return true;
        }
        source = inner.source();
    }
    false
}
