//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API, both WebSocket endpoints, and OpenAPI documentation.

use crate::{
    handlers,
    models::{
        CallStarted, EndCallPayload, ErrorResponse, SessionView, SetChatPayload, SummaryView,
        ToolEventView,
    },
    state::AppState,
    ws::{agent_ws_handler, feed_ws_handler},
};

use axum::{
    Router,
    routing::{get, post, put},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::start_call,
        handlers::end_call,
        handlers::get_call,
        handlers::list_tool_events,
        handlers::dismiss_summary,
        handlers::close_summary,
        handlers::set_chat,
    ),
    components(
        schemas(CallStarted, SessionView, ToolEventView, SummaryView, SetChatPayload, EndCallPayload, ErrorResponse)
    ),
    tags(
        (name = "Callboard API", description = "Operator controls for the voice-agent call session")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/call", get(handlers::get_call))
        .route("/call/start", post(handlers::start_call))
        .route("/call/end", post(handlers::end_call))
        .route("/call/tool-events", get(handlers::list_tool_events))
        .route("/call/summary/dismiss", post(handlers::dismiss_summary))
        .route("/call/summary/close", post(handlers::close_summary))
        .route("/call/chat", put(handlers::set_chat))
        .route("/agent/ws", get(agent_ws_handler))
        .route("/feed/ws", get(feed_ws_handler))
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
