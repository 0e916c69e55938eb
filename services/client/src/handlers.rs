//! Axum Handlers for the REST API
//!
//! Operator-facing endpoints for driving the call session. Every handler
//! talks to the session actor through its [`SessionHandle`](callboard_core::session::SessionHandle),
//! so requests are applied in the same order as agent traffic.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{error, info};

use crate::{
    models::{CallStarted, EndCallPayload, ErrorResponse, SessionView, SetChatPayload, ToolEventView},
    state::AppState,
};

pub enum ApiError {
    /// The session actor has stopped.
    Unavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unavailable(message) => {
                error!(%message, "Session unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, Json(ErrorResponse { message })).into_response()
            }
        }
    }
}

impl From<callboard_core::error::SessionError> for ApiError {
    fn from(err: callboard_core::error::SessionError) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Start a new call.
///
/// Discards the previous call's tool events and summary, moves the lifecycle
/// to `connecting` and starts the agent join deadline.
#[utoipa::path(
    post,
    path = "/call/start",
    responses(
        (status = 201, description = "Call started", body = CallStarted),
        (status = 503, description = "Session is not running", body = ErrorResponse)
    )
)]
pub async fn start_call(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let call_id = state.session.start_call().await?;
    info!(%call_id, "Call started by operator");
    Ok((StatusCode::CREATED, Json(CallStarted { call_id })))
}

/// End the current call and disconnect the agent.
#[utoipa::path(
    post,
    path = "/call/end",
    request_body(content = EndCallPayload, description = "Optional reason", content_type = "application/json"),
    responses(
        (status = 204, description = "Call ended"),
        (status = 503, description = "Session is not running", body = ErrorResponse)
    )
)]
pub async fn end_call(
    State(state): State<Arc<AppState>>,
    payload: Option<Json<EndCallPayload>>,
) -> Result<StatusCode, ApiError> {
    let reason = payload
        .and_then(|Json(p)| p.reason)
        .unwrap_or_else(|| "Call ended by operator".to_string());
    state.session.end_call(reason)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Get the current session view.
#[utoipa::path(
    get,
    path = "/call",
    responses(
        (status = 200, description = "Current session", body = SessionView),
        (status = 503, description = "Session is not running", body = ErrorResponse)
    )
)]
pub async fn get_call(State(state): State<Arc<AppState>>) -> Result<Json<SessionView>, ApiError> {
    let snapshot = state.session.snapshot().await?;
    Ok(Json(snapshot.into()))
}

/// Get every tool event logged during the current call, oldest first.
#[utoipa::path(
    get,
    path = "/call/tool-events",
    responses(
        (status = 200, description = "Tool event log", body = [ToolEventView]),
        (status = 503, description = "Session is not running", body = ErrorResponse)
    )
)]
pub async fn list_tool_events(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ToolEventView>>, ApiError> {
    let events = state.session.tool_events().await?;
    Ok(Json(events.into_iter().map(ToolEventView::from).collect()))
}

/// Hide the summary overlay. The summary itself is kept.
#[utoipa::path(
    post,
    path = "/call/summary/dismiss",
    responses(
        (status = 204, description = "Overlay hidden"),
        (status = 503, description = "Session is not running", body = ErrorResponse)
    )
)]
pub async fn dismiss_summary(State(state): State<Arc<AppState>>) -> Result<StatusCode, ApiError> {
    state.session.dismiss_overlay()?;
    Ok(StatusCode::NO_CONTENT)
}

/// Hide the summary overlay and end the call.
#[utoipa::path(
    post,
    path = "/call/summary/close",
    responses(
        (status = 204, description = "Overlay hidden and call ended"),
        (status = 503, description = "Session is not running", body = ErrorResponse)
    )
)]
pub async fn close_summary(State(state): State<Arc<AppState>>) -> Result<StatusCode, ApiError> {
    state.session.close_summary()?;
    Ok(StatusCode::NO_CONTENT)
}

/// Open or close the chat panel.
#[utoipa::path(
    put,
    path = "/call/chat",
    request_body = SetChatPayload,
    responses(
        (status = 204, description = "Chat panel updated"),
        (status = 503, description = "Session is not running", body = ErrorResponse)
    )
)]
pub async fn set_chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SetChatPayload>,
) -> Result<StatusCode, ApiError> {
    state.session.set_chat_open(payload.open)?;
    Ok(StatusCode::NO_CONTENT)
}
