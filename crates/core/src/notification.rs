//! Transient operator notifications ("toasts").

use serde::Serialize;
use std::time::Duration;

/// Default lifetime of a routine toast.
pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_millis(4_000);
/// Summaries stay on screen longer than routine tool toasts.
pub const DEFAULT_SUMMARY_TOAST_DURATION: Duration = Duration::from_millis(15_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    ToolSuccess,
    ToolError,
    SummaryReady,
    Info,
    SessionEnded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Icon {
    CheckCircle,
    Clock,
    XCircle,
    Info,
    CalendarCheck,
    Phone,
    ListChecks,
}

/// Display category of a known agent tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    Identity,
    SlotListing,
    Booking,
    Retrieval,
    Cancellation,
    Modification,
    Conclusion,
    Info,
}

impl ToolCategory {
    /// Looks up the category of a tool by name; unknown tools are `Info`.
    pub fn for_tool(tool: &str) -> Self {
        match tool {
            "identify_user" => Self::Identity,
            "fetch_slots" => Self::SlotListing,
            "book_appointment" => Self::Booking,
            "retrieve_appointments" => Self::Retrieval,
            "cancel_appointment" => Self::Cancellation,
            "modify_appointment" => Self::Modification,
            "end_conversation" => Self::Conclusion,
            _ => Self::Info,
        }
    }

    pub fn icon(&self) -> Icon {
        match self {
            Self::Identity => Icon::Phone,
            Self::SlotListing | Self::Retrieval => Icon::ListChecks,
            Self::Booking => Icon::CalendarCheck,
            Self::Cancellation => Icon::XCircle,
            Self::Modification => Icon::Clock,
            Self::Conclusion => Icon::CheckCircle,
            Self::Info => Icon::Info,
        }
    }

    /// Accent colour used by the operator console.
    pub fn color(&self) -> &'static str {
        match self {
            Self::Identity => "blue",
            Self::SlotListing => "purple",
            Self::Booking => "green",
            Self::Retrieval => "cyan",
            Self::Cancellation => "orange",
            Self::Modification => "amber",
            Self::Conclusion | Self::Info => "gray",
        }
    }
}

/// A request to show one transient notification. Never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationIntent {
    pub kind: NotificationKind,
    pub title: String,
    pub description: String,
    pub icon: Icon,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
}

fn serialize_millis<S: serde::Serializer>(duration: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(duration.as_millis() as u64)
}

/// Receives notification intents as they are produced.
#[cfg_attr(test, mockall::automock)]
pub trait NotificationSink: Send + Sync {
    fn notify(&self, intent: NotificationIntent);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_category_lookup() {
        assert_eq!(ToolCategory::for_tool("book_appointment").icon(), Icon::CalendarCheck);
        assert_eq!(ToolCategory::for_tool("identify_user").icon(), Icon::Phone);
        assert_eq!(ToolCategory::for_tool("modify_appointment").color(), "amber");
        assert_eq!(ToolCategory::for_tool("launch_rocket"), ToolCategory::Info);
        assert_eq!(ToolCategory::for_tool("launch_rocket").icon(), Icon::Info);
    }

    #[test]
    fn test_intent_serializes_duration_in_millis() {
        let intent = NotificationIntent {
            kind: NotificationKind::SummaryReady,
            title: "Call Summary Ready".into(),
            description: "Review your conversation summary".into(),
            icon: Icon::CheckCircle,
            duration: DEFAULT_SUMMARY_TOAST_DURATION,
        };
        let json = serde_json::to_value(&intent).unwrap();
        assert_eq!(json["kind"], "summary-ready");
        assert_eq!(json["icon"], "check_circle");
        assert_eq!(json["duration_ms"], 15_000);
    }
}
