//! Defines the WebSocket message protocols spoken by the client.
//!
//! The remote agent talks to `/agent/ws` with [`AgentFrame`]s and receives
//! [`ClientFrame`]s. Operator consoles subscribe to `/feed/ws` and receive
//! [`FeedMessage`]s.

use callboard_core::notification::NotificationIntent;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Frames sent by the remote agent.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentFrame {
    /// Invokes a registered RPC method. `data` is the raw invocation envelope.
    RpcRequest {
        request_id: String,
        method: String,
        #[serde(default)]
        data: Option<Value>,
    },
    /// Reports the agent's current state (e.g. `"listening"`).
    AgentState { state: String },
}

/// Frames sent back to the remote agent.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// The textual result of an RPC invocation, success or failure.
    RpcResponse { request_id: String, result: String },
    /// The invocation could not be routed to a method.
    RpcError { request_id: String, message: String },
    /// The client is ending the session.
    Disconnect { reason: String },
}

/// Messages pushed to operator consoles.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedMessage {
    Notification { intent: NotificationIntent },
}
