//! Callboard Client Library Crate
//!
//! Hosts a call session for the operator console: the WebSocket transport the
//! remote agent connects to, the operator REST API, and the live notification
//! feed. The `client` binary is a thin wrapper around this library.

pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod sink;
pub mod state;
pub mod ws;
