//! Intake service configuration.
//!
//! Loaded from the environment (prefix `LEADGATE`, `__` separator) after an
//! optional `.env` file, with an optional `leadgate.toml`-style file source
//! underneath. Every intake-related setting is optional: an absent secret or
//! credential disables or relaxes the corresponding behavior instead of
//! failing startup.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use crate::verify::DEFAULT_VERIFY_URL;

/// Service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IntakeConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Log level / env-filter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Comma-separated allow-listed origins; `*.` prefixes match subdomains.
    /// Unset or empty disables the origin gate.
    #[serde(default)]
    pub allowed_origins: Option<String>,

    /// Human-verification secret; unset skips verification entirely.
    #[serde(default)]
    pub turnstile_secret_key: Option<String>,

    /// Verification endpoint override (tests point this at a local server).
    #[serde(default = "default_verify_url")]
    pub turnstile_verify_url: String,

    /// Email provider API key; unset skips the email channel.
    #[serde(default)]
    pub resend_api_key: Option<String>,

    /// Sender address; unset skips the email channel.
    #[serde(default)]
    pub resend_from_email: Option<String>,

    /// Lead notification recipient.
    #[serde(default = "default_receiver_email")]
    pub lead_receiver_email: String,

    /// Email provider API base.
    #[serde(default = "default_resend_api_url")]
    pub resend_api_url: String,

    /// Storage base URL; unset skips the storage channel.
    #[serde(default)]
    pub supabase_url: Option<String>,

    /// Storage service credential; unset skips the storage channel.
    #[serde(default)]
    pub supabase_service_role_key: Option<String>,

    /// Leads table name.
    #[serde(default = "default_leads_table")]
    pub supabase_leads_table: String,

    /// Remote atomic-counter store for rate limiting; unset keeps counting
    /// in-process.
    #[serde(default)]
    pub rate_limit_rest_url: Option<String>,

    #[serde(default)]
    pub rate_limit_rest_token: Option<String>,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            log_level: default_log_level(),
            allowed_origins: None,
            turnstile_secret_key: None,
            turnstile_verify_url: default_verify_url(),
            resend_api_key: None,
            resend_from_email: None,
            lead_receiver_email: default_receiver_email(),
            resend_api_url: default_resend_api_url(),
            supabase_url: None,
            supabase_service_role_key: None,
            supabase_leads_table: default_leads_table(),
            rate_limit_rest_url: None,
            rate_limit_rest_token: None,
        }
    }
}

impl IntakeConfig {
    /// Load configuration from environment variables and config files.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let builder = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::with_name("leadgate").required(false))
            // Override with environment variables
            .add_source(config::Environment::with_prefix("LEADGATE").separator("__"));

        let config: IntakeConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Get the socket address to bind to.
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr.parse()?)
    }

    /// Get request timeout as Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Parsed origin allow-list; empty means the gate is disabled.
    pub fn origin_allow_list(&self) -> Vec<String> {
        self.allowed_origins
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(|entry| entry.trim().to_ascii_lowercase())
                    .filter(|entry| !entry.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_verify_url() -> String {
    DEFAULT_VERIFY_URL.to_string()
}

fn default_receiver_email() -> String {
    "leads@example.com".to_string()
}

fn default_resend_api_url() -> String {
    "https://api.resend.com".to_string()
}

fn default_leads_table() -> String {
    "lead_requests".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = IntakeConfig::default();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.timeout_secs, 30);
        assert_eq!(cfg.supabase_leads_table, "lead_requests");
        assert!(cfg.turnstile_secret_key.is_none());
        assert!(cfg.origin_allow_list().is_empty());
    }

    #[test]
    fn test_socket_addr() {
        let cfg = IntakeConfig::default();
        let addr = cfg.socket_addr().unwrap();
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn origin_list_parsing_trims_and_lowercases() {
        let cfg = IntakeConfig {
            allowed_origins: Some(" Example.com, *.Example.com ,, demo.io ".to_string()),
            ..IntakeConfig::default()
        };
        assert_eq!(
            cfg.origin_allow_list(),
            vec!["example.com", "*.example.com", "demo.io"]
        );
    }
}
