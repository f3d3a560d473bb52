//! Per-client submission throttling.
//!
//! Two implementations sit behind [`RateLimiter`]: an in-process
//! [`InMemoryRateLimiter`] over a `DashMap`, and a [`RemoteRateLimiter`] that
//! talks to an atomic-counter REST store and falls back to the in-process
//! counter whenever the store misbehaves. The handler picks one at startup
//! based on configuration and never touches ambient global state.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;

/// Throttle window per client address.
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(10 * 60);

/// Maximum submissions allowed inside one window.
pub const RATE_LIMIT_MAX_REQUESTS: u32 = 8;

/// Abuse-deterrence gate keyed by client address.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Record one request for `key` and report whether it is allowed.
    async fn check(&self, key: &str) -> bool;
}

/// Per-address counter state.
#[derive(Debug)]
struct RateBucket {
    window_start: Instant,
    count: u32,
}

/// Once the map holds this many buckets, expired entries are swept on the
/// next check. Keeps one-shot client addresses from accumulating forever.
const PURGE_THRESHOLD: usize = 1024;

/// Process-local rate limiter over a concurrent map.
pub struct InMemoryRateLimiter {
    buckets: DashMap<String, RateBucket>,
    window: Duration,
    max_requests: u32,
}

impl InMemoryRateLimiter {
    pub fn new() -> Self {
        Self::with_limits(RATE_LIMIT_WINDOW, RATE_LIMIT_MAX_REQUESTS)
    }

    pub fn with_limits(window: Duration, max_requests: u32) -> Self {
        Self {
            buckets: DashMap::new(),
            window,
            max_requests,
        }
    }
}

impl Default for InMemoryRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        if self.buckets.len() >= PURGE_THRESHOLD {
            self.buckets
                .retain(|_, bucket| now.duration_since(bucket.window_start) <= self.window);
        }
        let mut entry = self
            .buckets
            .entry(key.to_string())
            .or_insert(RateBucket {
                window_start: now,
                count: 0,
            });
        let bucket = entry.value_mut();

        if now.duration_since(bucket.window_start) > self.window {
            bucket.window_start = now;
            bucket.count = 0;
        }

        bucket.count += 1;
        bucket.count <= self.max_requests
    }
}

#[derive(Debug, Deserialize)]
struct IncrResponse {
    result: u64,
}

/// Rate limiter backed by a REST atomic-counter store (`GET {url}/incr/{key}`
/// with bearer auth), shared across server instances.
pub struct RemoteRateLimiter {
    client: reqwest::Client,
    base_url: String,
    token: String,
    window: Duration,
    max_requests: u32,
    fallback: InMemoryRateLimiter,
}

impl RemoteRateLimiter {
    pub fn new(client: reqwest::Client, base_url: String, token: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            window: RATE_LIMIT_WINDOW,
            max_requests: RATE_LIMIT_MAX_REQUESTS,
            fallback: InMemoryRateLimiter::new(),
        }
    }

    async fn increment(&self, key: &str) -> Result<u64, reqwest::Error> {
        let url = format!("{}/incr/{}", self.base_url, key);
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?;
        let body: IncrResponse = response.json().await?;
        Ok(body.result)
    }

    /// Best-effort window expiry, issued without waiting for the result.
    /// Failure leaves a counter the store keeps anyway; ignored by design.
    fn spawn_expire(&self, key: &str) {
        let client = self.client.clone();
        let token = self.token.clone();
        let url = format!("{}/expire/{}/{}", self.base_url, key, self.window.as_secs());
        tokio::spawn(async move {
            let _ = client.get(url).bearer_auth(token).send().await;
        });
    }
}

#[async_trait]
impl RateLimiter for RemoteRateLimiter {
    async fn check(&self, key: &str) -> bool {
        let scoped = format!("leadgate:rate:{key}");
        match self.increment(&scoped).await {
            Ok(count) => {
                if count == 1 {
                    self.spawn_expire(&scoped);
                }
                count <= u64::from(self.max_requests)
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "Remote rate limit store unavailable, using in-process counter"
                );
                self.fallback.check(key).await
            }
        }
    }
}
