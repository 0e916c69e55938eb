//! API Models
//!
//! Request and response bodies of the operator REST API, with `utoipa`
//! schemas for the OpenAPI document.

use callboard_core::{
    notification::ToolCategory,
    payload::CallSummary,
    reconciler::{SessionSnapshot, ToolEventRecord},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct CallStarted {
    #[schema(value_type = String, format = Uuid)]
    pub call_id: Uuid,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct ToolEventView {
    pub seq: u64,
    pub received_at: DateTime<Utc>,
    #[schema(example = "book_appointment")]
    pub tool: String,
    #[schema(example = "booked")]
    pub status: String,
    pub data: Option<Value>,
    pub ts: Option<String>,
    /// Accent colour of the tool's category.
    #[schema(example = "green")]
    pub color: String,
}

impl From<ToolEventRecord> for ToolEventView {
    fn from(record: ToolEventRecord) -> Self {
        let event = record.event;
        Self {
            seq: record.seq,
            received_at: record.received_at,
            tool: event.tool_name().to_string(),
            status: event.status().to_string(),
            color: ToolCategory::for_tool(event.tool_name()).color().to_string(),
            data: event.data.map(Value::Object),
            ts: event.ts,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq, Default)]
pub struct SummaryView {
    #[schema(example = "Booked for Friday")]
    pub summary: Option<String>,
    pub preferences: Option<Vec<String>>,
    pub booked_slots: Option<Vec<String>>,
    pub contact_number: Option<String>,
    pub created_at: Option<String>,
}

impl From<CallSummary> for SummaryView {
    fn from(summary: CallSummary) -> Self {
        Self {
            summary: summary.summary,
            preferences: summary.preferences,
            booked_slots: summary.booked_slots,
            contact_number: summary.contact_number,
            created_at: summary.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct SessionView {
    #[schema(value_type = Option<String>, format = Uuid)]
    pub call_id: Option<Uuid>,
    #[schema(example = "listening")]
    pub lifecycle: String,
    /// The most recent tool events, oldest first.
    pub recent_tool_events: Vec<ToolEventView>,
    /// Number of tool events logged during the current call.
    pub tool_event_count: usize,
    pub summary: Option<SummaryView>,
    pub overlay_visible: bool,
    pub chat_open: bool,
}

impl From<SessionSnapshot> for SessionView {
    fn from(snapshot: SessionSnapshot) -> Self {
        Self {
            call_id: snapshot.call_id,
            lifecycle: snapshot.lifecycle.to_string(),
            recent_tool_events: snapshot
                .recent_tool_events
                .into_iter()
                .map(ToolEventView::from)
                .collect(),
            tool_event_count: snapshot.tool_event_count,
            summary: snapshot.summary.map(SummaryView::from),
            overlay_visible: snapshot.overlay_visible,
            chat_open: snapshot.chat_open,
        }
    }
}

#[derive(Deserialize, Serialize, ToSchema)]
pub struct SetChatPayload {
    #[schema(example = true)]
    pub open: bool,
}

#[derive(Deserialize, Serialize, ToSchema, Default)]
pub struct EndCallPayload {
    #[schema(example = "Operator hung up")]
    pub reason: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub message: String,
}
