//! Inbound Payload Validation
//!
//! Turns the loosely-typed envelope delivered by the remote agent into a typed
//! [`Notification`], or rejects it with an [`RpcError`]. Validation is pure:
//! broadcasting and notifying are left to the dispatcher.

use crate::error::RpcError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{fmt, str::FromStr};

/// The `payload` carried by an inbound RPC envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Serialized JSON that still has to be decoded.
    Text(String),
    /// A value the transport already decoded.
    Structured(Value),
}

/// The envelope of a single RPC invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub payload: Option<Payload>,
}

impl InboundMessage {
    pub fn text(payload: impl Into<String>) -> Self {
        Self {
            payload: Some(Payload::Text(payload.into())),
        }
    }

    pub fn structured(payload: Value) -> Self {
        Self {
            payload: Some(Payload::Structured(payload)),
        }
    }

    /// Builds an envelope from raw invocation data.
    ///
    /// Returns `None` when the data is not a JSON object. A `payload` that is
    /// present but `null` is kept, and fails later for lacking a `type`.
    pub fn from_json(data: Value) -> Option<Self> {
        let Value::Object(mut envelope) = data else {
            return None;
        };
        let payload = match envelope.remove("payload") {
            None => None,
            Some(Value::String(text)) => Some(Payload::Text(text)),
            Some(other) => Some(Payload::Structured(other)),
        };
        Some(Self { payload })
    }
}

/// The closed set of notification types the agent may send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    ToolCall,
    CallSummary,
    UserData,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ToolCall => "tool_call",
            Self::CallSummary => "call_summary",
            Self::UserData => "user_data",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = RpcError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "tool_call" => Ok(Self::ToolCall),
            "call_summary" => Ok(Self::CallSummary),
            "user_data" => Ok(Self::UserData),
            _ => Err(RpcError::UnknownType),
        }
    }
}

/// Reads an optional display string. Non-string scalars are stringified.
fn text_field(body: &Map<String, Value>, key: &str) -> Option<String> {
    match body.get(key)? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// Reads an optional list of display strings. A lone value becomes a
/// one-element list.
fn list_field(body: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    let as_text = |value: &Value| match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    match body.get(key)? {
        Value::Null => None,
        Value::Array(items) => Some(items.iter().map(as_text).collect()),
        other => Some(vec![as_text(other)]),
    }
}

/// A tool invocation reported by the agent.
///
/// The typed fields are a lenient projection for display; `payload` keeps the
/// body exactly as it was sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ToolEvent {
    pub tool: Option<String>,
    pub status: Option<String>,
    /// Only set when the agent sent an object.
    pub data: Option<Map<String, Value>>,
    /// Agent-side timestamp, only used as a display key.
    pub ts: Option<String>,
    pub payload: Map<String, Value>,
}

impl ToolEvent {
    pub fn from_payload(payload: Map<String, Value>) -> Self {
        Self {
            tool: text_field(&payload, "tool"),
            status: text_field(&payload, "status"),
            data: payload.get("data").and_then(Value::as_object).cloned(),
            ts: text_field(&payload, "ts"),
            payload,
        }
    }

    pub fn tool_name(&self) -> &str {
        self.tool.as_deref().unwrap_or("unknown")
    }

    pub fn status(&self) -> &str {
        self.status.as_deref().unwrap_or("ok")
    }
}

/// The end-of-call summary. Fields are never validated; shapes the console
/// cannot display are still kept in `payload`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CallSummary {
    pub summary: Option<String>,
    pub preferences: Option<Vec<String>>,
    pub booked_slots: Option<Vec<String>>,
    pub contact_number: Option<String>,
    pub created_at: Option<String>,
    pub payload: Map<String, Value>,
}

impl CallSummary {
    pub fn from_payload(payload: Map<String, Value>) -> Self {
        Self {
            summary: text_field(&payload, "summary"),
            preferences: list_field(&payload, "preferences"),
            booked_slots: list_field(&payload, "booked_slots"),
            contact_number: text_field(&payload, "contact_number"),
            created_at: text_field(&payload, "created_at"),
            payload,
        }
    }
}

/// Contact details identified by the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    pub phone: String,
    pub name: String,
    pub source: String,
}

impl UserData {
    fn from_payload(payload: &Map<String, Value>) -> Self {
        let field = |key: &str| match payload.get("data").and_then(|data| data.get(key)) {
            None | Some(Value::Null) => "unknown".to_string(),
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
        };
        Self {
            phone: field("phone"),
            name: field("name"),
            source: field("source"),
        }
    }
}

/// A validated, typed notification.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    ToolCall(ToolEvent),
    CallSummary(CallSummary),
    UserData(UserData),
}

impl Notification {
    pub fn kind(&self) -> NotificationType {
        match self {
            Self::ToolCall(_) => NotificationType::ToolCall,
            Self::CallSummary(_) => NotificationType::CallSummary,
            Self::UserData(_) => NotificationType::UserData,
        }
    }
}

/// Validates an inbound envelope and classifies its payload.
///
/// Rules are applied in order: envelope shape, payload decoding, presence of
/// a non-blank `type`, membership of `type` in the known set. Bodies that pass
/// these checks are always accepted, whatever the shape of their other fields.
pub fn validate(message: Option<&InboundMessage>) -> Result<Notification, RpcError> {
    let payload = message
        .and_then(|message| message.payload.as_ref())
        .ok_or(RpcError::InvalidEnvelope)?;

    let decoded = match payload {
        Payload::Text(text) => {
            serde_json::from_str::<Value>(text).map_err(|e| RpcError::Decode(e.to_string()))?
        }
        Payload::Structured(value) => value.clone(),
    };

    let kind: NotificationType = decoded
        .get("type")
        .and_then(Value::as_str)
        .filter(|kind| !kind.trim().is_empty())
        .ok_or(RpcError::MissingType)?
        .parse()?;

    // A string `type` was found, so the body is an object.
    let Value::Object(body) = decoded else {
        return Err(RpcError::Internal("notification body is not an object".to_string()));
    };
    let notification = match kind {
        NotificationType::ToolCall => Notification::ToolCall(ToolEvent::from_payload(body)),
        NotificationType::CallSummary => Notification::CallSummary(CallSummary::from_payload(body)),
        NotificationType::UserData => Notification::UserData(UserData::from_payload(&body)),
    };
    Ok(notification)
}
