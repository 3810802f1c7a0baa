//! Axum HTTP channel: exposes the gateway's dispatchers and health report.
//!
//! ## URL layout
//!
//! ```text
//! POST /classify         {text}    → {classification, confidence, text, source}
//! POST /chat             {message} → {reply, confidence, original_message, source}
//! GET  /health                     → {status, services, backends, checked_at}
//! POST /health/refresh             → re-probe classifier, then same as GET /health
//! ```
//!
//! Every route is also served under `/api`.  `run()` drives the axum event
//! loop; the [`CancellationToken`] is wired to axum's graceful shutdown.

mod api;

use std::sync::Arc;

use axum::{Router, routing::{get, post}};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::AppError;
use crate::gateway::Gateway;

// ── Shared request state ──────────────────────────────────────────────────────

/// Router state injected into every handler via [`axum::extract::State`].
///
/// Cheap to clone; the gateway is reference-counted.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
}

// ── Server loop ───────────────────────────────────────────────────────────────

/// Bind `bind_addr` and serve until `shutdown` is cancelled.
pub async fn run(
    bind_addr: &str,
    gateway: Arc<Gateway>,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|e| AppError::Server(format!("bind failed on {bind_addr}: {e}")))?;

    info!(%bind_addr, "http channel listening");

    axum::serve(listener, build_router(AppState { gateway }))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Server(format!("axum server error: {e}")))?;

    info!("http channel shut down");
    Ok(())
}

// ── Router ────────────────────────────────────────────────────────────────────

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(routes())
        .nest("/api", routes())
        .with_state(state)
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/classify",       post(api::classify))
        .route("/chat",           post(api::chat))
        .route("/health",         get(api::health))
        .route("/health/refresh", post(api::health_refresh))
}
