//! Server initialization and routing
//!
//! This module handles the Axum server setup including:
//! - Router configuration
//! - Middleware stack (intake gate, timeout, CORS, tracing)
//! - Graceful shutdown handling

use crate::config::IntakeConfig;
use crate::middleware::intake_gate;
use crate::routes::{self, api_info, not_found};
use crate::state::AppState;
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Build the Axum router with all routes and middleware.
///
/// The intake gate (method check, origin allow-list, rate limiting) wraps
/// only the submission route; probes stay ungated. CORS is permissive because
/// the origin allow-list, not CORS, is the enforcement point.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let intake_routes = Router::new()
        .route(
            "/api/leads",
            post(routes::leads::submit_lead).options(routes::leads::preflight),
        )
        .layer(from_fn_with_state(state.clone(), intake_gate));

    Router::new()
        .route("/", get(api_info))
        .route("/health", get(routes::health::health_check))
        .route("/ready", get(routes::health::readiness_check))
        .merge(intake_routes)
        .fallback(not_found)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(state.config.timeout_secs),
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the lead intake HTTP server.
///
/// Blocks until shutdown via SIGTERM or Ctrl+C.
pub async fn start_server(config: IntakeConfig) -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .with_target(false)
        .json()
        .init();

    let state = Arc::new(AppState::new(config.clone()));
    let app = build_router(state);

    let addr: SocketAddr = config.socket_addr()?;

    tracing::info!("Starting leadgate on {}", addr);
    tracing::info!(
        "Origin gate: {}, verification: {}, email: {}, storage: {}, remote rate limit: {}",
        config.allowed_origins.is_some(),
        config.turnstile_secret_key.is_some(),
        config.resend_api_key.is_some() && config.resend_from_email.is_some(),
        config.supabase_url.is_some() && config.supabase_service_role_key.is_some(),
        config.rate_limit_rest_url.is_some(),
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Shutdown signal handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
