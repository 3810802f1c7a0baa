//! Axum handlers.
//!
//! Each dispatch runs on a spawned task that owns a [`CancellationToken`];
//! the handler holds the token's drop guard.  If the client goes away the
//! handler future is dropped, the guard cancels the token, and the chain
//! stops after the strategy currently running.

use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::AppState;
use crate::error::GatewayError;
use crate::gateway::Gateway;
use crate::health::HealthReport;
use crate::types::Resolution;

// ── Request types ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct ClassifyRequest {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct ChatRequest {
    #[serde(default)]
    message: Option<String>,
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Build a JSON error response body.
fn json_error(code: &str, msg: impl std::fmt::Display) -> Json<serde_json::Value> {
    Json(json!({ "error": code, "message": format!("{msg}") }))
}

fn bad_request(request_id: Uuid, rejection: &JsonRejection) -> Response {
    warn!(%request_id, "malformed request body: {rejection}");
    (StatusCode::BAD_REQUEST, json_error("bad_request", rejection.body_text())).into_response()
}

fn empty_input(field: &str) -> Response {
    (StatusCode::BAD_REQUEST, json_error("empty_input", format!("missing {field}"))).into_response()
}

/// Map a dispatch failure to a status code. Only empty input is the caller's fault.
fn dispatch_error(request_id: Uuid, err: &GatewayError) -> Response {
    match err {
        GatewayError::EmptyInput => {
            (StatusCode::BAD_REQUEST, json_error("empty_input", err)).into_response()
        }
        _ => {
            error!(%request_id, error = %err, "dispatch failed");
            (StatusCode::INTERNAL_SERVER_ERROR, json_error("internal", err)).into_response()
        }
    }
}

fn join_error(request_id: Uuid, err: &JoinError) -> Response {
    error!(%request_id, "dispatch task failed: {err}");
    (StatusCode::INTERNAL_SERVER_ERROR, json_error("internal", "dispatch task failed")).into_response()
}

/// Run `f` on its own task, cancelling it between strategies if this future is dropped.
async fn detached<F, Fut>(gateway: Arc<Gateway>, f: F) -> Result<Result<Resolution, GatewayError>, JoinError>
where
    F: FnOnce(Arc<Gateway>, CancellationToken) -> Fut,
    Fut: Future<Output = Result<Resolution, GatewayError>> + Send + 'static,
{
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    tokio::spawn(f(gateway, cancel)).await
}

fn health_body(report: &HealthReport) -> Json<serde_json::Value> {
    Json(json!({
        "status": report.overall,
        "services": report.service_names(),
        "backends": report.backends,
        "checked_at": report.checked_at,
    }))
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// POST /classify
pub(super) async fn classify(
    State(state): State<AppState>,
    body: Result<Json<ClassifyRequest>, JsonRejection>,
) -> Response {
    let request_id = Uuid::new_v4();
    let text = match body {
        Ok(Json(req)) => req.text.unwrap_or_default(),
        Err(rejection) => return bad_request(request_id, &rejection),
    };
    if text.is_empty() {
        return empty_input("text content");
    }

    let task_text = text.clone();
    let outcome = detached(state.gateway, move |gw, cancel| async move {
        gw.classification().classify_with(&task_text, &cancel).await
    })
    .await;

    match outcome {
        Ok(Ok(res)) => {
            info!(%request_id, label = %res.output, confidence = %res.confidence, source = %res.source, "classify");
            let body = json!({
                "classification": res.output,
                "confidence": res.confidence,
                "text": text,
                "source": res.source,
            });
            (StatusCode::OK, Json(body)).into_response()
        }
        Ok(Err(e)) => dispatch_error(request_id, &e),
        Err(e) => join_error(request_id, &e),
    }
}

/// POST /chat
pub(super) async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let request_id = Uuid::new_v4();
    let message = match body {
        Ok(Json(req)) => req.message.unwrap_or_default(),
        Err(rejection) => return bad_request(request_id, &rejection),
    };
    if message.is_empty() {
        return empty_input("message content");
    }

    let task_message = message.clone();
    let outcome = detached(state.gateway, move |gw, cancel| async move {
        gw.conversation().chat_with(&task_message, &cancel).await
    })
    .await;

    match outcome {
        Ok(Ok(res)) => {
            info!(%request_id, confidence = %res.confidence, source = %res.source, "chat");
            let body = json!({
                "reply": res.output,
                "confidence": res.confidence,
                "original_message": message,
                "source": res.source,
            });
            (StatusCode::OK, Json(body)).into_response()
        }
        Ok(Err(e)) => dispatch_error(request_id, &e),
        Err(e) => join_error(request_id, &e),
    }
}

/// GET /health
pub(super) async fn health(State(state): State<AppState>) -> Response {
    let report = state.gateway.health().await;
    (StatusCode::OK, health_body(&report)).into_response()
}

/// POST /health/refresh, re-probe the classifier, then report.
pub(super) async fn health_refresh(State(state): State<AppState>) -> Response {
    let ready = state.gateway.probe().await;
    info!(ready, "health refresh");
    let report = state.gateway.health().await;
    (StatusCode::OK, health_body(&report)).into_response()
}
