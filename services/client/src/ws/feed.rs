//! Streams notification intents to operator consoles.

use super::protocol::FeedMessage;
use crate::state::AppState;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{error, info, instrument, warn};

pub async fn feed_ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    // Subscribed before the upgrade so intents sent during the handshake are kept.
    let feed = state.feed.subscribe();
    ws.on_upgrade(|socket| handle_socket(socket, feed))
}

#[instrument(name = "feed_ws", skip_all)]
async fn handle_socket(socket: WebSocket, mut feed: broadcast::Receiver<FeedMessage>) {
    info!("Operator console connected.");
    let (mut socket_tx, mut socket_rx) = socket.split();

    loop {
        tokio::select! {
            msg = feed.recv() => match msg {
                Ok(msg) => {
                    let serialized = match serde_json::to_string(&msg) {
                        Ok(s) => s,
                        Err(e) => {
                            error!(error = %e, "Failed to serialize feed message.");
                            continue;
                        }
                    };
                    if socket_tx.send(Message::Text(serialized.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Operator console fell behind."),
                Err(RecvError::Closed) => break,
            },
            incoming = socket_rx.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
    info!("Operator console disconnected.");
}
