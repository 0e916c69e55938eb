//! WebSocket Endpoints
//!
//! - `protocol`: JSON frames exchanged with the agent and the operator feed.
//! - `agent`: the transport the remote agent connects to; carries RPC
//!   invocations and agent-state reports in, and disconnect commands out.
//! - `feed`: pushes notification intents to operator consoles.

mod agent;
mod feed;
pub mod protocol;

pub use agent::agent_ws_handler;
pub use feed::feed_ws_handler;
