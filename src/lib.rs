//! Leadgate - lead intake HTTP service.
//!
//! Receives form submissions from the marketing site, gates them (origin
//! allow-list, per-address rate limit, honeypot, human verification), and
//! delivers each accepted lead over two independent channels at once: an
//! email provider and a row-oriented backing store. A submission counts as
//! delivered when at least one channel accepts it.
//!
//! # Pipeline
//!
//! ```text
//! POST /api/leads
//!   → origin allow-list (403)
//!   → rate limit by client address (429)
//!   → body parse, 200 KB ceiling (400)
//!   → honeypot trap (200, silently ignored)
//!   → per-type field validation (400)
//!   → human-verification token (400 rejected / 502 unavailable)
//!   → email + storage fan-out (joined) → 200, or 503 if both fail
//! ```
//!
//! # Endpoints
//!
//! - `POST /api/leads` - submit a lead (`OPTIONS` answers 204)
//! - `GET /` - API information
//! - `GET /health` - liveness probe
//! - `GET /ready` - readiness probe
//!
//! Everything is configured through the environment (prefix `LEADGATE`); any
//! absent credential disables its feature instead of failing startup. See
//! [`IntakeConfig`].
//!
//! ```rust,no_run
//! use leadgate::IntakeConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = IntakeConfig::load()?;
//!     leadgate::start_server(config).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod deliver;
pub mod error;
pub mod lead;
pub mod middleware;
pub mod ratelimit;
pub mod routes;
pub mod server;
pub mod state;
pub mod verify;

pub use config::IntakeConfig;
pub use error::{IntakeError, IntakeResult};
pub use lead::{Lead, SubmissionContext};
pub use server::{build_router, start_server};
pub use state::AppState;
