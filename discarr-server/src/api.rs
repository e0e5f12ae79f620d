//! HTTP control surface.
//!
//! | Route          | Response                                       |
//! |----------------|------------------------------------------------|
//! | `GET /health`  | `{"status":"ok","outputMode","platform"}`      |
//! | `GET /status`  | `{"state","outputMode","source"?,"pid"?}`      |
//! | `POST /play`   | `{"status":"playing","source"}`                |
//! | `POST /stop`   | `{"status":"stopped"}`                         |
//! | `POST /pause`  | `{"status":"paused"}`                          |
//! | `POST /resume` | `{"status":"playing"}`                         |
//!
//! Failures are `{"error","kind"}` with a status derived from the kind.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use discarr_core::{DiscarrError, ErrorKind, PlayRequest, SessionCoordinator, Status};

use crate::config::Platform;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<SessionCoordinator>,
    pub platform: Platform,
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/play", post(play))
        .route("/stop", post(stop))
        .route("/pause", post(pause))
        .route("/resume", post(resume))
        .layer(cors)
        .with_state(state)
}

// ── Request / response bodies ────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Local,
    Url,
    Jellyfin,
}

/// `POST /play` body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayBody {
    pub source: SourceKind,
    pub path: Option<String>,
    pub url: Option<String>,
    pub jellyfin_url: Option<String>,
}

impl TryFrom<PlayBody> for PlayRequest {
    type Error = DiscarrError;

    fn try_from(body: PlayBody) -> Result<Self, Self::Error> {
        let missing = |field: &str, source: &str| {
            DiscarrError::InvalidRequest(format!("{field} is required when source is {source}"))
        };
        match body.source {
            SourceKind::Local => body
                .path
                .map(PlayRequest::local)
                .ok_or_else(|| missing("path", "local")),
            SourceKind::Url => body
                .url
                .map(PlayRequest::remote)
                .ok_or_else(|| missing("url", "url")),
            SourceKind::Jellyfin => body
                .jellyfin_url
                .map(PlayRequest::catalog)
                .ok_or_else(|| missing("jellyfinUrl", "jellyfin")),
        }
    }
}

#[derive(Debug, Serialize)]
struct CommandResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
}

impl CommandResponse {
    fn new(status: &'static str) -> Json<Self> {
        Json(Self {
            status,
            source: None,
        })
    }
}

// ── Errors ───────────────────────────────────────────────────────

/// A [`DiscarrError`] rendered as `{"error","kind"}`.
#[derive(Debug)]
pub struct ApiError(pub DiscarrError);

impl From<DiscarrError> for ApiError {
    fn from(e: DiscarrError) -> Self {
        Self(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(DiscarrError::InvalidRequest(rejection.body_text()))
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidRequest | ErrorKind::UnresolvableReference | ErrorKind::NothingPlaying => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::NotImplemented => StatusCode::NOT_IMPLEMENTED,
        ErrorKind::IntegrationNotConfigured | ErrorKind::SessionUnavailable => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        ErrorKind::SessionTimeout => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = status_for(kind);
        if status.is_server_error() {
            warn!(%kind, "request failed: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string(), "kind": kind }))).into_response()
    }
}

// ── Handlers ─────────────────────────────────────────────────────

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "outputMode": state.coordinator.output_mode(),
        "platform": state.platform.as_str(),
    }))
}

async fn status(State(state): State<AppState>) -> Json<Status> {
    Json(state.coordinator.status().await)
}

async fn play(
    State(state): State<AppState>,
    body: Result<Json<PlayBody>, JsonRejection>,
) -> Result<Json<CommandResponse>, ApiError> {
    let Json(body) = body?;
    let request = PlayRequest::try_from(body)?;
    let source = state.coordinator.play(request).await?;
    Ok(Json(CommandResponse {
        status: "playing",
        source: Some(source),
    }))
}

async fn stop(State(state): State<AppState>) -> Result<Json<CommandResponse>, ApiError> {
    state.coordinator.stop().await?;
    Ok(CommandResponse::new("stopped"))
}

async fn pause(State(state): State<AppState>) -> Result<Json<CommandResponse>, ApiError> {
    state.coordinator.pause().await?;
    Ok(CommandResponse::new("paused"))
}

async fn resume(State(state): State<AppState>) -> Result<Json<CommandResponse>, ApiError> {
    state.coordinator.resume().await?;
    Ok(CommandResponse::new("playing"))
}

// ── Tests ────────────────────────────────────────────────────────
