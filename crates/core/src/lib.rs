pub mod bus;
pub mod dispatcher;
pub mod error;
pub mod lifecycle;
pub mod notification;
pub mod payload;
pub mod reconciler;
pub mod rpc;
pub mod session;
pub mod watchdog;

/// Name under which the notification handler is registered with the transport.
pub const SHOW_NOTIFICATION_METHOD: &str = "client.showNotification";

/// Represents commands that the core logic issues to an external runtime.
///
/// This enum decouples the session's decisions from the transport that
/// carries them out (closing the agent connection, for example).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Close the connection to the remote agent, with a human-readable reason.
    Disconnect { reason: String },
}
