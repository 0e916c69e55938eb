//! Session State Reconciler
//!
//! Owns everything the operator sees about the current call: the tool-event
//! log, the current summary and its overlay, the chat panel, and the
//! lifecycle. It is a plain state machine; the session runtime feeds it.

use crate::{
    bus::BusEvent,
    lifecycle::LifecycleState,
    payload::{CallSummary, ToolEvent},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

/// Number of tool events shown in the activity panel.
pub const DEFAULT_TOOL_EVENT_WINDOW: usize = 6;

/// A tool event as logged for the current call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolEventRecord {
    /// Arrival ordinal within the call, starting at zero.
    pub seq: u64,
    pub received_at: DateTime<Utc>,
    pub event: ToolEvent,
}

/// An owned view of the reconciler at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub call_id: Option<Uuid>,
    pub lifecycle: LifecycleState,
    pub recent_tool_events: Vec<ToolEventRecord>,
    pub tool_event_count: usize,
    pub summary: Option<CallSummary>,
    pub overlay_visible: bool,
    pub chat_open: bool,
}

#[derive(Debug, Default)]
pub struct Reconciler {
    call_id: Option<Uuid>,
    lifecycle: LifecycleState,
    tool_events: Vec<ToolEventRecord>,
    summary: Option<CallSummary>,
    overlay_visible: bool,
    chat_open: bool,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the start of a new call and forgets everything from the last one.
    pub fn start_call(&mut self, call_id: Uuid) {
        info!(%call_id, previous = ?self.call_id, "Call started");
        self.call_id = Some(call_id);
        self.tool_events.clear();
        self.summary = None;
        self.overlay_visible = false;
        self.chat_open = false;
        self.lifecycle = LifecycleState::Connecting;
    }

    pub fn apply(&mut self, event: BusEvent) {
        match event {
            BusEvent::ToolEvent(event) => {
                let seq = self.tool_events.len() as u64;
                debug!(seq, tool = event.tool_name(), status = event.status(), "Logged tool event");
                self.tool_events.push(ToolEventRecord {
                    seq,
                    received_at: Utc::now(),
                    event,
                });
            }
            BusEvent::CallSummary(summary) => {
                info!(lifecycle = %self.lifecycle, "Call summary received");
                self.summary = Some(summary);
                self.overlay_visible = true;
            }
        }
    }

    /// Applies an agent-state update if it moves the lifecycle forward.
    pub fn set_lifecycle(&mut self, next: LifecycleState) -> bool {
        if !self.lifecycle.can_advance_to(next) {
            debug!(current = %self.lifecycle, ignored = %next, "Ignoring backward lifecycle update");
            return false;
        }
        if self.lifecycle != next {
            info!(from = %self.lifecycle, to = %next, "Lifecycle changed");
        }
        self.lifecycle = next;
        true
    }

    /// Marks the call ended. Returns `false` if it already was.
    pub fn end_call(&mut self) -> bool {
        self.set_lifecycle(LifecycleState::Ended)
    }

    /// Hides the summary overlay; the summary itself is kept.
    pub fn dismiss_overlay(&mut self) {
        self.overlay_visible = false;
    }

    pub fn set_chat_open(&mut self, open: bool) {
        self.chat_open = open;
    }

    pub fn call_id(&self) -> Option<Uuid> {
        self.call_id
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.lifecycle
    }

    pub fn tool_events(&self) -> &[ToolEventRecord] {
        &self.tool_events
    }

    /// The last `window` tool events, oldest first.
    pub fn recent_tool_events(&self, window: usize) -> &[ToolEventRecord] {
        let start = self.tool_events.len().saturating_sub(window);
        &self.tool_events[start..]
    }

    pub fn summary(&self) -> Option<&CallSummary> {
        self.summary.as_ref()
    }

    pub fn overlay_visible(&self) -> bool {
        self.overlay_visible && self.summary.is_some()
    }

    pub fn chat_open(&self) -> bool {
        self.chat_open
    }

    pub fn snapshot(&self, window: usize) -> SessionSnapshot {
        SessionSnapshot {
            call_id: self.call_id,
            lifecycle: self.lifecycle,
            recent_tool_events: self.recent_tool_events(window).to_vec(),
            tool_event_count: self.tool_events.len(),
            summary: self.summary.clone(),
            overlay_visible: self.overlay_visible(),
            chat_open: self.chat_open,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(name: &str, status: &str) -> BusEvent {
        BusEvent::ToolEvent(ToolEvent {
            tool: Some(name.into()),
            status: Some(status.into()),
            ..Default::default()
        })
    }

    fn summary(text: &str, slots: &[&str]) -> CallSummary {
        CallSummary {
            summary: Some(text.into()),
            booked_slots: Some(slots.iter().map(|s| s.to_string()).collect()),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_call_clears_previous_call_state() {
        let mut reconciler = Reconciler::new();
        reconciler.start_call(Uuid::new_v4());
        reconciler.apply(tool("fetch_slots", "listed"));
        reconciler.apply(BusEvent::CallSummary(summary("Old call", &["Mon 9am"])));
        reconciler.set_chat_open(true);
        assert!(reconciler.overlay_visible());

        reconciler.start_call(Uuid::new_v4());

        assert!(reconciler.tool_events().is_empty());
        assert_eq!(reconciler.summary(), None);
        assert!(!reconciler.overlay_visible());
        assert!(!reconciler.chat_open());
        assert_eq!(reconciler.lifecycle(), LifecycleState::Connecting);
    }

    #[test]
    fn test_tool_events_keep_arrival_order_without_dedup() {
        let mut reconciler = Reconciler::new();
        reconciler.start_call(Uuid::new_v4());
        for i in 0..8 {
            reconciler.apply(tool("fetch_slots", &format!("listed-{i}")));
        }
        reconciler.apply(tool("fetch_slots", "listed-7"));

        assert_eq!(reconciler.tool_events().len(), 9);
        let recent = reconciler.recent_tool_events(DEFAULT_TOOL_EVENT_WINDOW);
        assert_eq!(recent.len(), 6);
        assert_eq!(recent[0].seq, 3);
        assert_eq!(recent[5].seq, 8);
        assert_eq!(recent[4].event, recent[5].event);
        assert_eq!(reconciler.recent_tool_events(50).len(), 9);
    }

    #[test]
    fn test_summary_replaces_wholesale_and_shows_overlay() {
        let mut reconciler = Reconciler::new();
        reconciler.start_call(Uuid::new_v4());
        reconciler.set_lifecycle(LifecycleState::LISTENING);

        let first = summary("Booked for Friday", &["Fri 10am"]);
        reconciler.apply(BusEvent::CallSummary(first.clone()));
        assert!(reconciler.overlay_visible());
        assert_eq!(reconciler.summary(), Some(&first));

        let second = CallSummary {
            summary: Some("Moved to Monday".into()),
            booked_slots: Some(vec!["Mon 2pm".into()]),
            preferences: Some(vec!["afternoons".into()]),
            ..Default::default()
        };
        reconciler.apply(BusEvent::CallSummary(second.clone()));
        assert_eq!(reconciler.summary(), Some(&second));
        assert_eq!(
            reconciler.summary().and_then(|s| s.booked_slots.clone()),
            Some(vec!["Mon 2pm".to_string()])
        );
    }

    #[test]
    fn test_dismissal_keeps_summary_until_it_changes() {
        let mut reconciler = Reconciler::new();
        reconciler.start_call(Uuid::new_v4());
        reconciler.apply(BusEvent::CallSummary(summary("Done", &[])));

        reconciler.dismiss_overlay();
        assert!(!reconciler.overlay_visible());
        assert!(reconciler.summary().is_some());

        reconciler.apply(tool("end_conversation", "summary_sent"));
        assert!(!reconciler.overlay_visible());

        reconciler.apply(BusEvent::CallSummary(summary("Updated", &[])));
        assert!(reconciler.overlay_visible());
    }

    #[test]
    fn test_summary_accepted_before_call_is_active() {
        let mut reconciler = Reconciler::new();
        reconciler.start_call(Uuid::new_v4());
        reconciler.apply(BusEvent::CallSummary(summary("Early", &[])));
        assert_eq!(reconciler.lifecycle(), LifecycleState::Connecting);
        assert!(reconciler.overlay_visible());
    }

    #[test]
    fn test_lifecycle_is_monotonic() {
        let mut reconciler = Reconciler::new();
        reconciler.start_call(Uuid::new_v4());
        assert!(reconciler.set_lifecycle(LifecycleState::Initializing));
        assert!(reconciler.set_lifecycle(LifecycleState::LISTENING));
        assert!(!reconciler.set_lifecycle(LifecycleState::Connecting));
        assert!(reconciler.set_lifecycle(LifecycleState::SPEAKING));
        assert!(reconciler.end_call());
        assert!(!reconciler.end_call());
        assert_eq!(reconciler.lifecycle(), LifecycleState::Ended);

        reconciler.start_call(Uuid::new_v4());
        assert_eq!(reconciler.lifecycle(), LifecycleState::Connecting);
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let mut reconciler = Reconciler::new();
        let call_id = Uuid::new_v4();
        reconciler.start_call(call_id);
        reconciler.apply(tool("identify_user", "identified"));
        reconciler.set_chat_open(true);

        let snapshot = reconciler.snapshot(DEFAULT_TOOL_EVENT_WINDOW);
        assert_eq!(snapshot.call_id, Some(call_id));
        assert_eq!(snapshot.tool_event_count, 1);
        assert_eq!(snapshot.recent_tool_events[0].event.tool_name(), "identify_user");
        assert!(snapshot.chat_open);
        assert!(!snapshot.overlay_visible);
    }
}
