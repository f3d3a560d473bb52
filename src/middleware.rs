//! Intake gate middleware: origin allow-list and rate limiting.
//!
//! Runs in front of the submission handler so a throttled or off-origin
//! client never gets as far as body parsing. Pre-flight probes pass straight
//! through. The resolved client address is stashed in request extensions for
//! the handler.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, Method};
use axum::middleware::Next;
use axum::response::Response;

use crate::error::IntakeError;
use crate::state::AppState;

/// Client address resolved from forwarding headers.
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

impl Default for ClientIp {
    fn default() -> Self {
        Self("unknown".to_string())
    }
}

/// Origin + rate-limit gate for the intake route.
pub async fn intake_gate(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, IntakeError> {
    if request.method() == Method::OPTIONS {
        return Ok(next.run(request).await);
    }
    if request.method() != Method::POST {
        return Err(IntakeError::MethodNotAllowed);
    }

    let allow_list = state.config.origin_allow_list();
    if !allow_list.is_empty() {
        let origin = request_origin(request.headers());
        match origin {
            Some(origin) if origin_allowed(&allow_list, &origin) => {}
            _ => return Err(IntakeError::OriginForbidden),
        }
    }

    let ip = client_ip(request.headers());
    if !state.rate_limiter.check(&ip).await {
        tracing::warn!(ip = %ip, "Submission rate limit exceeded");
        return Err(IntakeError::RateLimited);
    }

    request.extensions_mut().insert(ClientIp(ip));
    Ok(next.run(request).await)
}

/// First `x-forwarded-for` entry, or "unknown" when absent.
pub(crate) fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "unknown".to_string())
}

/// The `Origin` header, falling back to `Referer`.
fn request_origin(headers: &HeaderMap) -> Option<String> {
    headers
        .get("origin")
        .or_else(|| headers.get("referer"))
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Match an origin value against the allow-list.
///
/// Ports are stripped and matching is case-insensitive. A `*.example.com`
/// pattern matches any true subdomain; the apex must be listed explicitly.
pub(crate) fn origin_allowed(patterns: &[String], origin: &str) -> bool {
    let Some(host) = origin_host(origin) else {
        return false;
    };

    patterns.iter().any(|pattern| {
        if let Some(suffix) = pattern.strip_prefix("*.") {
            host.len() > suffix.len() + 1 && host.ends_with(suffix) && {
                let boundary = host.len() - suffix.len() - 1;
                host.as_bytes()[boundary] == b'.'
            }
        } else {
            host == *pattern
        }
    })
}

/// Extract the lowercased host from an origin or referrer value.
fn origin_host(value: &str) -> Option<String> {
    let rest = value.split_once("://").map(|(_, rest)| rest).unwrap_or(value);
    let host_port = rest.split(['/', '?', '#']).next()?;
    let host = match host_port.rsplit_once(':') {
        Some((head, tail)) if !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()) => head,
        _ => host_port,
    };
    let host = host.trim().to_ascii_lowercase();
    (!host.is_empty()).then_some(host)
}
