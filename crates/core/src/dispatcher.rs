//! Event Classifier/Dispatcher
//!
//! Takes a validated [`Notification`] and fans it out: tool calls and
//! summaries are broadcast on the [`EventBus`], and every accepted
//! notification produces exactly one [`NotificationIntent`].

use crate::{
    bus::{BusEvent, EventBus},
    notification::{
        DEFAULT_SUMMARY_TOAST_DURATION, DEFAULT_TOAST_DURATION, Icon, NotificationIntent,
        NotificationKind, NotificationSink, ToolCategory,
    },
    payload::{self, CallSummary, InboundMessage, Notification, ToolEvent, UserData},
    rpc::RpcMethod,
};
use async_trait::async_trait;
use serde_json::Value;
use std::{collections::HashSet, sync::Arc, time::Duration};
use tracing::{debug, warn};

/// Tunables for classification and toast lifetimes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Tool statuses that count as failures.
    pub error_statuses: HashSet<String>,
    pub toast_duration: Duration,
    pub summary_toast_duration: Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            error_statuses: ["conflict", "not_found"]
                .into_iter()
                .map(String::from)
                .collect(),
            toast_duration: DEFAULT_TOAST_DURATION,
            summary_toast_duration: DEFAULT_SUMMARY_TOAST_DURATION,
        }
    }
}

pub struct Dispatcher {
    bus: EventBus,
    sink: Arc<dyn NotificationSink>,
    settings: DispatchSettings,
}

impl Dispatcher {
    pub fn new(bus: EventBus, sink: Arc<dyn NotificationSink>, settings: DispatchSettings) -> Self {
        Self {
            bus,
            sink,
            settings,
        }
    }

    /// Validates and dispatches one inbound message, returning the RPC result.
    ///
    /// Never fails: every rejection is rendered as an `"Error: "` string.
    pub fn handle(&self, message: Option<&InboundMessage>) -> String {
        match payload::validate(message).map(|notification| self.dispatch(notification)) {
            Ok(confirmation) => confirmation.to_string(),
            Err(e) => {
                warn!(error = %e, "Rejected agent notification");
                e.to_response()
            }
        }
    }

    /// Performs the side effects for a validated notification.
    pub fn dispatch(&self, notification: Notification) -> &'static str {
        debug!(kind = %notification.kind(), "Dispatching agent notification");
        match notification {
            Notification::ToolCall(event) => {
                let intent = self.tool_intent(&event);
                self.bus.publish(BusEvent::ToolEvent(event));
                self.sink.notify(intent);
                "Tool event delivered"
            }
            Notification::CallSummary(summary) => {
                let intent = self.summary_intent(&summary);
                self.bus.publish(BusEvent::CallSummary(summary));
                self.sink.notify(intent);
                "Summary delivered"
            }
            Notification::UserData(user) => {
                self.sink.notify(self.user_intent(&user));
                "User data delivered"
            }
        }
    }

    pub fn is_error_status(&self, status: &str) -> bool {
        self.settings.error_statuses.contains(status)
    }

    fn tool_intent(&self, event: &ToolEvent) -> NotificationIntent {
        let (tool, status) = (event.tool_name(), event.status());
        if self.is_error_status(status) {
            NotificationIntent {
                kind: NotificationKind::ToolError,
                title: format!("{}: {}", tool, status),
                description: "Tool encountered an issue".to_string(),
                icon: Icon::XCircle,
                duration: self.settings.toast_duration,
            }
        } else {
            NotificationIntent {
                kind: NotificationKind::ToolSuccess,
                title: tool.to_string(),
                description: format!("Status: {}", status),
                icon: ToolCategory::for_tool(tool).icon(),
                duration: self.settings.toast_duration,
            }
        }
    }

    fn summary_intent(&self, _summary: &CallSummary) -> NotificationIntent {
        NotificationIntent {
            kind: NotificationKind::SummaryReady,
            title: "Call Summary Ready".to_string(),
            description: "Review your conversation summary".to_string(),
            icon: Icon::CheckCircle,
            duration: self.settings.summary_toast_duration,
        }
    }

    fn user_intent(&self, user: &UserData) -> NotificationIntent {
        NotificationIntent {
            kind: NotificationKind::Info,
            title: "User data received".to_string(),
            description: format!(
                "Phone: {}, Name: {} ({})",
                user.phone, user.name, user.source
            ),
            icon: Icon::Phone,
            duration: self.settings.toast_duration,
        }
    }
}

#[async_trait]
impl RpcMethod for Dispatcher {
    async fn invoke(&self, data: Option<Value>) -> String {
        let message = data.and_then(InboundMessage::from_json);
        self.handle(message.as_ref())
    }
}
