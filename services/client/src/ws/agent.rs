//! Manages the WebSocket connection to the remote agent.

use super::protocol::{AgentFrame, ClientFrame};
use crate::state::AppState;
use anyhow::Result;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use callboard_core::{Command, lifecycle::LifecycleState};
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, instrument, warn};

/// Axum handler to upgrade an HTTP connection to the agent transport.
pub async fn agent_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

#[instrument(name = "agent_ws", skip_all)]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    info!("Agent connected.");
    if let Err(e) = run_agent_connection(socket, &state).await {
        error!(error = ?e, "Agent connection terminated with error.");
    }
    info!("Agent connection closed.");
}

/// The event loop for one agent connection.
///
/// Frames are handled one at a time, so RPC invocations reach the session in
/// the order the agent sent them.
async fn run_agent_connection(socket: WebSocket, state: &AppState) -> Result<()> {
    let (mut socket_tx, mut socket_rx) = socket.split();
    let mut commands = state.session.subscribe_commands();

    loop {
        tokio::select! {
            msg = socket_rx.next() => match msg {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<AgentFrame>(&text) {
                    Ok(frame) => handle_frame(frame, state, &mut socket_tx).await?,
                    Err(e) => warn!(error = %e, "Ignoring malformed agent frame."),
                },
                Some(Ok(Message::Close(_))) | None => {
                    info!("Agent closed the connection.");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!("Error receiving from agent WebSocket: {:?}", e);
                    break;
                }
            },
            command = commands.recv() => match command {
                Ok(Command::Disconnect { reason }) => {
                    info!(%reason, "Disconnecting agent.");
                    send_msg(&mut socket_tx, ClientFrame::Disconnect { reason }).await?;
                    let _ = socket_tx.send(Message::Close(None)).await;
                    break;
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Missed session commands."),
                Err(RecvError::Closed) => break,
            },
        }
    }
    Ok(())
}

async fn handle_frame(
    frame: AgentFrame,
    state: &AppState,
    socket_tx: &mut SplitSink<WebSocket, Message>,
) -> Result<()> {
    match frame {
        AgentFrame::RpcRequest {
            request_id,
            method,
            data,
        } => {
            debug!(%request_id, %method, "RPC request");
            let reply = match state.rpc.invoke(&method, data).await {
                Ok(result) => ClientFrame::RpcResponse { request_id, result },
                Err(e) => {
                    warn!(%method, error = %e, "Rejected RPC request.");
                    ClientFrame::RpcError {
                        request_id,
                        message: e.to_string(),
                    }
                }
            };
            send_msg(socket_tx, reply).await?;
        }
        AgentFrame::AgentState { state: name } => match LifecycleState::from_agent_state(&name) {
            Some(lifecycle) => state.session.report_agent_state(lifecycle)?,
            None => warn!(state = %name, "Ignoring unknown agent state."),
        },
    }
    Ok(())
}

/// A helper function to serialize and send a `ClientFrame` to the agent.
async fn send_msg(socket_tx: &mut SplitSink<WebSocket, Message>, msg: ClientFrame) -> Result<()> {
    let serialized = serde_json::to_string(&msg)?;
    socket_tx.send(Message::Text(serialized.into())).await?;
    Ok(())
}
