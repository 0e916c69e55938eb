//! In-process publish/subscribe for agent events.
//!
//! Publishing is synchronous: by the time [`EventBus::publish`] returns, every
//! subscriber has the event queued. Events from one publisher arrive in
//! publish order. Queues are unbounded so no subscriber ever misses an event.
//!
//! Subscribers run without the subscriber lock held, so they may publish or
//! subscribe themselves.

use crate::payload::{CallSummary, ToolEvent};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::debug;

/// Events fanned out to every interested component. Both variants keep the
/// agent's body verbatim in their `payload` field.
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    ToolEvent(ToolEvent),
    CallSummary(CallSummary),
}

/// Delivers one event; returns `false` once the subscriber has gone away.
type Subscriber = Arc<dyn Fn(&BusEvent) -> bool + Send + Sync>;

/// A cloneable handle to a shared set of subscribers.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new channel subscriber. Dropping the receiver unsubscribes it.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<BusEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribe_with(move |event| tx.send(event.clone()).is_ok());
        rx
    }

    /// Registers a delivery function, for subscribers that fold bus events
    /// into a queue of their own.
    pub fn subscribe_with<F>(&self, deliver: F)
    where
        F: Fn(&BusEvent) -> bool + Send + Sync + 'static,
    {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(deliver));
    }

    /// Delivers `event` to every live subscriber and returns how many received it.
    pub fn publish(&self, event: BusEvent) -> usize {
        let subscribers: Vec<Subscriber> = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let total = subscribers.len();
        let dead: Vec<Subscriber> = subscribers
            .into_iter()
            .filter(|deliver| !deliver(&event))
            .collect();

        if !dead.is_empty() {
            self.subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|live| !dead.iter().any(|gone| Arc::ptr_eq(live, gone)));
        }
        let delivered = total - dead.len();
        debug!(subscribers = delivered, "Published bus event");
        delivered
    }
}
