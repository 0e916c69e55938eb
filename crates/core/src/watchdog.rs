//! Liveness Watchdog
//!
//! Armed when a call starts connecting. If the agent has not become available
//! by the deadline, it reports a [`WatchdogExpiry`]; the session runtime turns
//! that into a forced disconnect.

use crate::lifecycle::LifecycleState;
use std::time::Duration;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::Instant,
};
use tracing::{debug, warn};
use uuid::Uuid;

pub const DEFAULT_AGENT_JOIN_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryReason {
    /// The lifecycle never left `Connecting`.
    AgentNeverJoined,
    /// The agent joined but never reached an active sub-state.
    AgentNotInitialized,
}

impl ExpiryReason {
    pub fn message(&self) -> &'static str {
        match self {
            Self::AgentNeverJoined => "Agent did not join the room.",
            Self::AgentNotInitialized => "Agent connected but did not complete initializing.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchdogExpiry {
    pub call_id: Uuid,
    pub reason: ExpiryReason,
}

/// A single cancellable deadline per call.
pub struct Watchdog {
    timeout: Duration,
    armed: Option<(Uuid, JoinHandle<()>)>,
}

impl Watchdog {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            armed: None,
        }
    }

    /// Starts the deadline for `call_id`, cancelling any deadline of an
    /// earlier call. Arming twice for the same call keeps the first deadline.
    ///
    /// At expiry the latest value of `lifecycle` decides whether to fire.
    pub fn arm(
        &mut self,
        call_id: Uuid,
        lifecycle: watch::Receiver<LifecycleState>,
        expiries: mpsc::UnboundedSender<WatchdogExpiry>,
    ) {
        if self.armed_for() == Some(call_id) {
            return;
        }
        self.disarm();

        let deadline = Instant::now() + self.timeout;
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let current = *lifecycle.borrow();
            let reason = match current {
                LifecycleState::Connecting => ExpiryReason::AgentNeverJoined,
                state if state.is_active() || state == LifecycleState::Ended => return,
                _ => ExpiryReason::AgentNotInitialized,
            };
            warn!(%call_id, lifecycle = %current, ?reason, "Agent did not become available in time");
            let _ = expiries.send(WatchdogExpiry { call_id, reason });
        });
        debug!(%call_id, timeout = ?self.timeout, "Watchdog armed");
        self.armed = Some((call_id, handle));
    }

    /// Cancels the pending deadline. Returns whether one was pending.
    pub fn disarm(&mut self) -> bool {
        match self.armed.take() {
            Some((call_id, handle)) => {
                handle.abort();
                debug!(%call_id, "Watchdog disarmed");
                true
            }
            None => false,
        }
    }

    /// The call whose deadline is still pending, if any.
    pub fn armed_for(&self) -> Option<Uuid> {
        self.armed
            .as_ref()
            .filter(|(_, handle)| !handle.is_finished())
            .map(|(call_id, _)| *call_id)
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.disarm();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(20);

    struct Harness {
        watchdog: Watchdog,
        state_tx: watch::Sender<LifecycleState>,
        expiries_tx: mpsc::UnboundedSender<WatchdogExpiry>,
        expiries_rx: mpsc::UnboundedReceiver<WatchdogExpiry>,
    }

    impl Harness {
        fn new() -> Self {
            let (state_tx, _) = watch::channel(LifecycleState::Connecting);
            let (expiries_tx, expiries_rx) = mpsc::unbounded_channel();
            Self {
                watchdog: Watchdog::new(TIMEOUT),
                state_tx,
                expiries_tx,
                expiries_rx,
            }
        }

        fn arm(&mut self, call_id: Uuid) {
            self.watchdog
                .arm(call_id, self.state_tx.subscribe(), self.expiries_tx.clone());
        }
    }

    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_exactly_once_when_agent_never_joins() {
        let mut h = Harness::new();
        let call_id = Uuid::new_v4();
        h.arm(call_id);

        tokio::time::advance(TIMEOUT - Duration::from_secs(1)).await;
        settle().await;
        assert!(h.expiries_rx.try_recv().is_err());

        tokio::time::advance(Duration::from_secs(2)).await;
        settle().await;
        assert_eq!(
            h.expiries_rx.try_recv(),
            Ok(WatchdogExpiry {
                call_id,
                reason: ExpiryReason::AgentNeverJoined
            })
        );

        tokio::time::advance(TIMEOUT * 3).await;
        settle().await;
        assert!(h.expiries_rx.try_recv().is_err());
        assert_eq!(h.watchdog.armed_for(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_joined_but_never_available() {
        let mut h = Harness::new();
        h.arm(Uuid::new_v4());
        h.state_tx.send_replace(LifecycleState::Initializing);

        tokio::time::advance(TIMEOUT + Duration::from_secs(1)).await;
        settle().await;
        let expiry = h.expiries_rx.try_recv().unwrap();
        assert_eq!(expiry.reason, ExpiryReason::AgentNotInitialized);
        assert_eq!(
            expiry.reason.message(),
            "Agent connected but did not complete initializing."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm_before_deadline_prevents_firing() {
        let mut h = Harness::new();
        let call_id = Uuid::new_v4();
        h.arm(call_id);
        assert_eq!(h.watchdog.armed_for(), Some(call_id));

        tokio::time::advance(Duration::from_secs(5)).await;
        h.state_tx.send_replace(LifecycleState::LISTENING);
        assert!(h.watchdog.disarm());
        assert!(!h.watchdog.disarm());

        tokio::time::advance(TIMEOUT * 2).await;
        settle().await;
        assert!(h.expiries_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_active_state_at_deadline_does_not_fire() {
        let mut h = Harness::new();
        h.arm(Uuid::new_v4());
        h.state_tx.send_replace(LifecycleState::SPEAKING);

        tokio::time::advance(TIMEOUT * 2).await;
        settle().await;
        assert!(h.expiries_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearming_for_a_new_call_cancels_the_old_deadline() {
        let mut h = Harness::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        h.arm(first);

        tokio::time::advance(Duration::from_secs(10)).await;
        h.arm(second);
        h.arm(second);

        tokio::time::advance(Duration::from_secs(15)).await;
        settle().await;
        assert!(h.expiries_rx.try_recv().is_err());

        tokio::time::advance(Duration::from_secs(10)).await;
        settle().await;
        assert_eq!(h.expiries_rx.try_recv().map(|e| e.call_id), Ok(second));
        assert!(h.expiries_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_the_watchdog_cancels_it() {
        let mut h = Harness::new();
        h.arm(Uuid::new_v4());
        drop(h.watchdog);

        tokio::time::advance(TIMEOUT * 2).await;
        settle().await;
        assert!(h.expiries_rx.try_recv().is_err());
    }
}
