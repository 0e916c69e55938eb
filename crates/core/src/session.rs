//! Call Session Runtime
//!
//! Wires the dispatcher, reconciler and watchdog together for one client.
//! All session state lives inside a single actor task that handles its inputs
//! one at a time, in the order they were queued:
//!
//! - call start/end signals and operator actions, via [`SessionHandle`];
//! - agent-state updates from the transport;
//! - tool events and summaries, delivered by the [`EventBus`];
//! - watchdog expiries.

use crate::{
    Command, SHOW_NOTIFICATION_METHOD,
    bus::{BusEvent, EventBus},
    dispatcher::{DispatchSettings, Dispatcher},
    error::SessionError,
    lifecycle::LifecycleState,
    notification::{DEFAULT_TOAST_DURATION, Icon, NotificationIntent, NotificationKind, NotificationSink},
    reconciler::{DEFAULT_TOOL_EVENT_WINDOW, Reconciler, SessionSnapshot, ToolEventRecord},
    rpc::RpcRegistry,
    watchdog::{DEFAULT_AGENT_JOIN_TIMEOUT, Watchdog, WatchdogExpiry},
};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{broadcast, mpsc, oneshot, watch},
    task::JoinHandle,
};
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// How long the agent has to become available after a call starts.
    pub agent_join_timeout: Duration,
    /// Number of tool events included in snapshots.
    pub tool_event_window: usize,
    /// Lifetime of the "Session ended" notice.
    pub notice_duration: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            agent_join_timeout: DEFAULT_AGENT_JOIN_TIMEOUT,
            tool_event_window: DEFAULT_TOOL_EVENT_WINDOW,
            notice_duration: DEFAULT_TOAST_DURATION,
        }
    }
}

#[derive(Debug)]
enum SessionInput {
    StartCall { reply: oneshot::Sender<Uuid> },
    AgentState(LifecycleState),
    EndCall { reason: String },
    DismissOverlay,
    CloseSummary,
    SetChatOpen(bool),
    Bus(BusEvent),
    Snapshot { reply: oneshot::Sender<SessionSnapshot> },
    ToolEvents { reply: oneshot::Sender<Vec<ToolEventRecord>> },
    Shutdown,
}

/// A cloneable handle for talking to the session actor.
#[derive(Clone)]
pub struct SessionHandle {
    inputs: mpsc::UnboundedSender<SessionInput>,
    commands: broadcast::Sender<Command>,
}

impl SessionHandle {
    fn send(&self, input: SessionInput) -> Result<(), SessionError> {
        self.inputs.send(input).map_err(|_| SessionError::Closed)
    }

    async fn request<T>(
        &self,
        input: impl FnOnce(oneshot::Sender<T>) -> SessionInput,
    ) -> Result<T, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(input(reply))?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Signals the start of a new call and returns its id.
    pub async fn start_call(&self) -> Result<Uuid, SessionError> {
        self.request(|reply| SessionInput::StartCall { reply }).await
    }

    /// Forwards the agent status reported by the transport.
    pub fn report_agent_state(&self, state: LifecycleState) -> Result<(), SessionError> {
        self.send(SessionInput::AgentState(state))
    }

    pub fn end_call(&self, reason: impl Into<String>) -> Result<(), SessionError> {
        self.send(SessionInput::EndCall {
            reason: reason.into(),
        })
    }

    pub fn dismiss_overlay(&self) -> Result<(), SessionError> {
        self.send(SessionInput::DismissOverlay)
    }

    /// Dismisses the summary overlay and ends the call.
    pub fn close_summary(&self) -> Result<(), SessionError> {
        self.send(SessionInput::CloseSummary)
    }

    pub fn set_chat_open(&self, open: bool) -> Result<(), SessionError> {
        self.send(SessionInput::SetChatOpen(open))
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(|reply| SessionInput::Snapshot { reply }).await
    }

    /// The full tool-event log of the current call.
    pub async fn tool_events(&self) -> Result<Vec<ToolEventRecord>, SessionError> {
        self.request(|reply| SessionInput::ToolEvents { reply }).await
    }

    /// Commands for the transport, such as forced disconnects.
    pub fn subscribe_commands(&self) -> broadcast::Receiver<Command> {
        self.commands.subscribe()
    }
}

/// The client-side session: RPC registration plus the running actor.
///
/// Dropping it (or calling [`CallSession::shutdown`]) unregisters the RPC
/// method and stops the actor, which cancels any pending watchdog deadline.
pub struct CallSession {
    handle: SessionHandle,
    registry: RpcRegistry,
    task: Option<JoinHandle<()>>,
}

impl CallSession {
    /// Registers the notification handler on `registry` and spawns the actor.
    pub fn start(
        registry: RpcRegistry,
        sink: Arc<dyn NotificationSink>,
        dispatch: DispatchSettings,
        settings: SessionSettings,
    ) -> Self {
        let (inputs_tx, inputs_rx) = mpsc::unbounded_channel();
        let (expiries_tx, expiries_rx) = mpsc::unbounded_channel();
        let (commands, _) = broadcast::channel(16);
        let (lifecycle_tx, _) = watch::channel(LifecycleState::Idle);

        let bus = EventBus::new();
        let bus_inputs = inputs_tx.clone();
        bus.subscribe_with(move |event| bus_inputs.send(SessionInput::Bus(event.clone())).is_ok());

        let dispatcher = Dispatcher::new(bus, sink.clone(), dispatch);
        registry.register(SHOW_NOTIFICATION_METHOD, Arc::new(dispatcher));

        let runtime = SessionRuntime {
            reconciler: Reconciler::new(),
            watchdog: Watchdog::new(settings.agent_join_timeout),
            lifecycle_tx,
            expiries_tx,
            sink,
            commands: commands.clone(),
            settings,
        };
        let task = tokio::spawn(
            runtime
                .run(inputs_rx, expiries_rx)
                .instrument(info_span!("call_session")),
        );

        Self {
            handle: SessionHandle {
                inputs: inputs_tx,
                commands,
            },
            registry,
            task: Some(task),
        }
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn subscribe_commands(&self) -> broadcast::Receiver<Command> {
        self.handle.subscribe_commands()
    }

    fn teardown(&mut self) {
        self.registry.unregister(SHOW_NOTIFICATION_METHOD);
        let _ = self.handle.send(SessionInput::Shutdown);
    }

    /// Tears the session down and waits for the actor to finish.
    pub async fn shutdown(mut self) {
        self.teardown();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = ?e, "Session runtime ended abnormally");
            }
        }
    }
}

impl Drop for CallSession {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.teardown();
        }
    }
}

struct SessionRuntime {
    reconciler: Reconciler,
    watchdog: Watchdog,
    lifecycle_tx: watch::Sender<LifecycleState>,
    expiries_tx: mpsc::UnboundedSender<WatchdogExpiry>,
    sink: Arc<dyn NotificationSink>,
    commands: broadcast::Sender<Command>,
    settings: SessionSettings,
}

impl SessionRuntime {
    async fn run(
        mut self,
        mut inputs: mpsc::UnboundedReceiver<SessionInput>,
        mut expiries: mpsc::UnboundedReceiver<WatchdogExpiry>,
    ) {
        info!("Session runtime started");
        loop {
            tokio::select! {
                input = inputs.recv() => match input {
                    Some(SessionInput::Shutdown) | None => break,
                    Some(input) => self.handle_input(input),
                },
                Some(expiry) = expiries.recv() => self.handle_expiry(expiry),
            }
        }
        self.watchdog.disarm();
        info!("Session runtime stopped");
    }

    fn handle_input(&mut self, input: SessionInput) {
        match input {
            SessionInput::StartCall { reply } => {
                let call_id = Uuid::new_v4();
                self.reconciler.start_call(call_id);
                self.publish_lifecycle();
                self.watchdog.arm(
                    call_id,
                    self.lifecycle_tx.subscribe(),
                    self.expiries_tx.clone(),
                );
                let _ = reply.send(call_id);
            }
            SessionInput::AgentState(state) => {
                if self.reconciler.set_lifecycle(state) {
                    self.publish_lifecycle();
                    if state.is_active() {
                        self.watchdog.disarm();
                    }
                }
            }
            SessionInput::EndCall { reason } => self.end_call(reason),
            SessionInput::DismissOverlay => self.reconciler.dismiss_overlay(),
            SessionInput::CloseSummary => {
                self.reconciler.dismiss_overlay();
                self.end_call("Call summary closed".to_string());
            }
            SessionInput::SetChatOpen(open) => self.reconciler.set_chat_open(open),
            SessionInput::Bus(event) => self.reconciler.apply(event),
            SessionInput::Snapshot { reply } => {
                let _ = reply.send(self.reconciler.snapshot(self.settings.tool_event_window));
            }
            SessionInput::ToolEvents { reply } => {
                let _ = reply.send(self.reconciler.tool_events().to_vec());
            }
            SessionInput::Shutdown => {}
        }
    }

    fn handle_expiry(&mut self, expiry: WatchdogExpiry) {
        if self.reconciler.call_id() != Some(expiry.call_id) {
            debug!(call_id = %expiry.call_id, "Ignoring watchdog expiry from a previous call");
            return;
        }
        let lifecycle = self.reconciler.lifecycle();
        if lifecycle.is_active() || lifecycle == LifecycleState::Ended {
            return;
        }
        let reason = expiry.reason.message();
        self.sink.notify(NotificationIntent {
            kind: NotificationKind::SessionEnded,
            title: "Session ended".to_string(),
            description: reason.to_string(),
            icon: Icon::Info,
            duration: self.settings.notice_duration,
        });
        self.end_call(reason.to_string());
    }

    fn end_call(&mut self, reason: String) {
        self.watchdog.disarm();
        if !self.reconciler.end_call() {
            return;
        }
        self.publish_lifecycle();
        info!(%reason, "Disconnecting agent");
        if self.commands.send(Command::Disconnect { reason }).is_err() {
            debug!("No transport is listening for commands");
        }
    }

    fn publish_lifecycle(&self) {
        self.lifecycle_tx.send_replace(self.reconciler.lifecycle());
    }
}
