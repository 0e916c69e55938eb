//! The notification sink used by the service: logs every intent and forwards
//! it to connected operator consoles.

use crate::ws::protocol::FeedMessage;
use callboard_core::notification::{NotificationIntent, NotificationKind, NotificationSink};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

pub struct FeedSink {
    feed: broadcast::Sender<FeedMessage>,
}

impl FeedSink {
    pub fn new(feed: broadcast::Sender<FeedMessage>) -> Self {
        Self { feed }
    }
}

impl NotificationSink for FeedSink {
    fn notify(&self, intent: NotificationIntent) {
        match intent.kind {
            NotificationKind::ToolError | NotificationKind::SessionEnded => warn!(
                kind = ?intent.kind,
                title = %intent.title,
                description = %intent.description,
                "Notification"
            ),
            _ => info!(
                kind = ?intent.kind,
                title = %intent.title,
                description = %intent.description,
                "Notification"
            ),
        }
        if self.feed.send(FeedMessage::Notification { intent }).is_err() {
            debug!("No operator console connected; notification not forwarded");
        }
    }
}
