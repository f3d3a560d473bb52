//! Shared application state.

use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;

use crate::config::IntakeConfig;
use crate::deliver::{DeliveryChannel, EmailChannel, StorageChannel};
use crate::ratelimit::{InMemoryRateLimiter, RateLimiter, RemoteRateLimiter};
use crate::verify::Verifier;

// Shared outbound HTTP client with connection pooling. The timeout also
// bounds the verification call so a stuck collaborator cannot hold a request
// past the surrounding request lifecycle.
static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .connect_timeout(Duration::from_secs(5))
        .build()
        .expect("Failed to build HTTP client")
});

/// Clone of the process-wide outbound HTTP client.
pub fn http_client() -> reqwest::Client {
    HTTP_CLIENT.clone()
}

/// Everything a request handler needs, injected rather than ambient.
pub struct AppState {
    pub config: Arc<IntakeConfig>,
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub verifier: Verifier,
    pub email: Arc<dyn DeliveryChannel>,
    pub storage: Arc<dyn DeliveryChannel>,
}

impl AppState {
    /// Wire up real collaborators from configuration.
    pub fn new(config: IntakeConfig) -> Self {
        let client = http_client();

        let rate_limiter: Arc<dyn RateLimiter> = match (
            config.rate_limit_rest_url.clone(),
            config.rate_limit_rest_token.clone(),
        ) {
            (Some(url), Some(token)) => {
                Arc::new(RemoteRateLimiter::new(client.clone(), url, token))
            }
            _ => Arc::new(InMemoryRateLimiter::new()),
        };

        let verifier = Verifier::new(
            config.turnstile_secret_key.clone(),
            config.turnstile_verify_url.clone(),
            client.clone(),
        );
        let email = Arc::new(EmailChannel::from_config(&config, client.clone()));
        let storage = Arc::new(StorageChannel::from_config(&config, client));

        Self {
            config: Arc::new(config),
            rate_limiter,
            verifier,
            email,
            storage,
        }
    }
}
