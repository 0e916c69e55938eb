//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds all shared,
//! clonable handles used by the HTTP and WebSocket handlers.

use crate::{config::Config, sink::FeedSink, ws::protocol::FeedMessage};
use callboard_core::{
    rpc::RpcRegistry,
    session::{CallSession, SessionHandle},
};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Capacity of the operator feed; slower consoles skip older intents.
const FEED_CAPACITY: usize = 64;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub session: SessionHandle,
    /// Methods the remote agent may invoke over `/agent/ws`.
    pub rpc: RpcRegistry,
    pub feed: broadcast::Sender<FeedMessage>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Starts the call session and builds the state around it.
    ///
    /// The returned [`CallSession`] owns the session runtime; keep it alive for
    /// as long as the server runs and shut it down afterwards.
    pub fn start(config: Config) -> (Arc<Self>, CallSession) {
        let rpc = RpcRegistry::new();
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        let session = CallSession::start(
            rpc.clone(),
            Arc::new(FeedSink::new(feed.clone())),
            config.dispatch_settings(),
            config.session_settings(),
        );
        let state = Arc::new(Self {
            session: session.handle(),
            rpc,
            feed,
            config: Arc::new(config),
        });
        (state, session)
    }
}
