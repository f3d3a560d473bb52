//! Human-verification (Turnstile-style) token checking.
//!
//! The verifier is disabled entirely when no secret is configured. A rejected
//! token and an unreachable verification service are deliberately distinct
//! outcomes: the former is the submitter's fault (400), the latter is not
//! (502).

use serde::Deserialize;

/// Default Cloudflare Turnstile siteverify endpoint.
pub const DEFAULT_VERIFY_URL: &str =
    "https://challenges.cloudflare.com/turnstile/v0/siteverify";

/// Result of checking a verification token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Token accepted by the upstream service.
    Passed,
    /// No secret configured; verification skipped.
    Skipped,
    /// Upstream rejected the token (or it was missing); reason is user-facing.
    Rejected(String),
    /// Upstream returned non-2xx or the call failed in transport.
    Unavailable(String),
}

#[derive(Debug, Deserialize)]
struct SiteverifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// Client for the human-verification challenge service.
#[derive(Clone)]
pub struct Verifier {
    secret: Option<String>,
    endpoint: String,
    client: reqwest::Client,
}

impl Verifier {
    pub fn new(secret: Option<String>, endpoint: String, client: reqwest::Client) -> Self {
        Self {
            secret,
            endpoint,
            client,
        }
    }

    /// Verify a submission token for the given client address.
    pub async fn verify(&self, token: &str, ip: &str) -> VerifyOutcome {
        let Some(secret) = self.secret.as_deref() else {
            return VerifyOutcome::Skipped;
        };

        if token.is_empty() {
            return VerifyOutcome::Rejected("Missing turnstile token.".to_string());
        }

        let form = [("secret", secret), ("response", token), ("remoteip", ip)];
        let response = match self.client.post(&self.endpoint).form(&form).send().await {
            Ok(response) => response,
            Err(err) => return VerifyOutcome::Unavailable(err.to_string()),
        };

        if !response.status().is_success() {
            return VerifyOutcome::Unavailable(format!(
                "Turnstile verification HTTP {}.",
                response.status().as_u16()
            ));
        }

        match response.json::<SiteverifyResponse>().await {
            Ok(body) => outcome_from_response(body),
            Err(err) => VerifyOutcome::Unavailable(err.to_string()),
        }
    }
}

fn outcome_from_response(body: SiteverifyResponse) -> VerifyOutcome {
    if body.success {
        return VerifyOutcome::Passed;
    }
    let reason = if body.error_codes.is_empty() {
        "Turnstile verification failed.".to_string()
    } else {
        body.error_codes.join(", ")
    };
    VerifyOutcome::Rejected(reason)
}
