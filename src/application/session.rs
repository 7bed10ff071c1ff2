//! QR pairing session controller
//!
//! Orchestrates the session state machine: converts stream events, timer
//! expirations and user input into [`SessionEvent`]s, and executes the
//! [`SessionAction`]s each transition returns.
//!
//! ```text
//! Stream/Timer/User input
//!   ↓
//! SessionController (converts to events)
//!   ↓
//! SessionStateMachine (pure state transitions)
//!   ↓
//! SessionActions (executed by the controller)
//!   ↓
//! Stream open/close, timers, toasts, UI events
//! ```
//!
//! Teardown discipline: everything the controller spawns — the stream
//! reader, the reopen/redirect timers — hangs off the handle's cancellation
//! token, so `SessionHandle::close()` at any moment (including mid-reopen)
//! stops all of it.

use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;

use wd_core::session::{
    ReopenPolicy, SessionAction, SessionEvent, SessionState, SessionStateMachine, TimerKind,
    REDIRECT_DELAY_SECS, REOPEN_DELAY_SECS,
};

use super::notify::NotificationSink;
use crate::error::{AppError, Result};
use crate::stream::{StreamConnector, StreamEvent};

/// What the pairing page renders from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionDomainEvent {
    /// The session moved to a new state.
    StateChanged(SessionState),
    /// A fresh QR payload should go on screen.
    QrUpdated(String),
    /// Pairing finished; leave the pairing page.
    NavigateHome,
}

/// User-originated commands accepted while the session runs.
enum SessionCommand {
    Refresh,
}

/// Everything that can wake the controller.
enum Input {
    Command(SessionCommand),
    Timer(TimerKind),
    Stream { generation: u64, event: StreamEvent },
}

/// Owner handle for one pairing session.
///
/// Dropping the handle closes the session; `close()` does the same
/// explicitly and is idempotent.
pub struct SessionHandle {
    cmd_tx: mpsc::Sender<Input>,
    cancel: CancellationToken,
}

impl SessionHandle {
    /// Tear the session down: stream, pending timers, controller task.
    /// Safe to call at any time, any number of times.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Restart the flow after a failure (the "Try Again" affordance).
    pub async fn refresh(&self) -> Result<()> {
        self.cmd_tx
            .send(Input::Command(SessionCommand::Refresh))
            .await
            .map_err(|_| AppError::internal("session controller has stopped"))
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Spawns and supervises pairing sessions.
pub struct SessionController;

impl SessionController {
    /// Start a pairing session for `account_id`.
    ///
    /// Returns the owner handle plus the event stream the page renders
    /// from. Exactly one underlying stream connection exists at any time;
    /// opening a new session while another handle is alive is the caller's
    /// bug to avoid (each page owns one handle).
    pub fn open(
        account_id: impl Into<String>,
        connector: Arc<dyn StreamConnector>,
        sink: Arc<NotificationSink>,
        policy: ReopenPolicy,
    ) -> (SessionHandle, mpsc::Receiver<SessionDomainEvent>) {
        let (input_tx, input_rx) = mpsc::channel(32);
        let (event_tx, event_rx) = mpsc::channel(32);
        let cancel = CancellationToken::new();

        let task = SessionTask {
            machine: SessionStateMachine::new(account_id, policy, Utc::now()),
            connector,
            sink,
            event_tx,
            input_tx: input_tx.clone(),
            timers: HashMap::new(),
            stream_cancel: None,
            generation: 0,
            last_state: SessionState::Idle,
            cancel: cancel.clone(),
        };
        tokio::spawn(task.run(input_rx));

        (
            SessionHandle {
                cmd_tx: input_tx,
                cancel,
            },
            event_rx,
        )
    }
}

struct SessionTask {
    machine: SessionStateMachine,
    connector: Arc<dyn StreamConnector>,
    sink: Arc<NotificationSink>,
    event_tx: mpsc::Sender<SessionDomainEvent>,
    input_tx: mpsc::Sender<Input>,
    /// Pending delayed follow-ups, abortable on teardown.
    timers: HashMap<TimerKind, AbortHandle>,
    /// Cancels the current stream reader, if one is open.
    stream_cancel: Option<CancellationToken>,
    /// Bumped whenever a stream closes; events from older streams are stale.
    generation: u64,
    last_state: SessionState,
    cancel: CancellationToken,
}

impl SessionTask {
    async fn run(mut self, mut input_rx: mpsc::Receiver<Input>) {
        self.apply(SessionEvent::Open).await;

        loop {
            let input = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                input = input_rx.recv() => match input {
                    Some(input) => input,
                    None => break,
                },
            };

            match input {
                Input::Command(SessionCommand::Refresh) => {
                    self.apply(SessionEvent::ManualRefresh).await;
                }
                Input::Timer(kind) => {
                    self.timers.remove(&kind);
                    let event = match kind {
                        TimerKind::Reopen => SessionEvent::ReopenElapsed,
                        TimerKind::Redirect => SessionEvent::RedirectElapsed,
                    };
                    self.apply(event).await;
                }
                Input::Stream { generation, event } => {
                    if generation != self.generation {
                        debug!("dropping stale event from stream generation {}", generation);
                        continue;
                    }
                    let event = match event {
                        StreamEvent::Payload(payload) => SessionEvent::PayloadReceived(payload),
                        StreamEvent::TransportError(error) => SessionEvent::TransportError(error),
                    };
                    self.apply(event).await;
                }
            }
        }

        self.shutdown();
    }

    async fn apply(&mut self, event: SessionEvent) {
        let (state, actions) = self.machine.handle_event(event, Utc::now());

        if state != self.last_state {
            self.last_state = state;
            let _ = self
                .event_tx
                .send(SessionDomainEvent::StateChanged(state))
                .await;
        }
        for action in actions {
            self.execute(action).await;
        }
    }

    async fn execute(&mut self, action: SessionAction) {
        match action {
            SessionAction::OpenStream => self.open_stream().await,
            SessionAction::CloseStream => self.close_stream(),
            SessionAction::ScheduleReopen => {
                self.start_timer(TimerKind::Reopen, Duration::from_secs(REOPEN_DELAY_SECS));
            }
            SessionAction::ScheduleRedirect => {
                self.start_timer(TimerKind::Redirect, Duration::from_secs(REDIRECT_DELAY_SECS));
            }
            SessionAction::CancelTimers => self.cancel_timers(),
            SessionAction::ShowQr { payload } => {
                let _ = self.event_tx.send(SessionDomainEvent::QrUpdated(payload)).await;
            }
            SessionAction::Navigate => {
                let _ = self.event_tx.send(SessionDomainEvent::NavigateHome).await;
            }
            SessionAction::Notify { text, severity } => self.sink.notify(text, severity),
        }
    }

    async fn open_stream(&mut self) {
        // Tear down the previous connection first: two streams must never
        // run concurrently for the same account.
        self.close_stream();

        let token = self.cancel.child_token();
        let generation = self.generation;
        let (tx, mut rx) = mpsc::channel(16);
        let account_id = self.machine.session().account_id.clone();

        match self.connector.open(&account_id, tx, token.clone()).await {
            Ok(()) => {
                self.stream_cancel = Some(token);
                let input_tx = self.input_tx.clone();
                tokio::spawn(async move {
                    while let Some(event) = rx.recv().await {
                        if input_tx
                            .send(Input::Stream { generation, event })
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                });
            }
            Err(e) => {
                warn!("failed to open qr stream for account {}: {}", account_id, e);
                // Feed the failure back through the input queue; the machine
                // decides what it means in the current state.
                let _ = self.input_tx.try_send(Input::Stream {
                    generation,
                    event: StreamEvent::TransportError(e.to_string()),
                });
            }
        }
    }

    fn close_stream(&mut self) {
        if let Some(token) = self.stream_cancel.take() {
            token.cancel();
        }
        // Anything still queued from the old stream is stale from here on
        self.generation += 1;
    }

    fn start_timer(&mut self, kind: TimerKind, delay: Duration) {
        let input_tx = self.input_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = input_tx.send(Input::Timer(kind)).await;
        });
        if let Some(previous) = self.timers.insert(kind, handle.abort_handle()) {
            previous.abort();
        }
    }

    fn cancel_timers(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }

    fn shutdown(&mut self) {
        self.close_stream();
        self.cancel_timers();
        debug!(
            "session controller stopped for account {}",
            self.machine.session().account_id
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::time::timeout;
    use wd_core::session::machine::{TOAST_CONNECTED, TOAST_EXPIRED};
    use wd_core::{Severity, StreamPayload};

    struct OpenedStream {
        tx: mpsc::Sender<StreamEvent>,
        cancel: CancellationToken,
    }

    /// Channel-driven stand-in for the SSE transport.
    #[derive(Default)]
    struct MockConnector {
        streams: Mutex<Vec<OpenedStream>>,
        /// Snapshot of "was the previous stream already cancelled" taken at
        /// each open, proving close-before-reopen ordering.
        prior_stream_closed_at_open: Mutex<Vec<bool>>,
    }

    #[async_trait::async_trait]
    impl StreamConnector for MockConnector {
        async fn open(
            &self,
            _account_id: &str,
            events: mpsc::Sender<StreamEvent>,
            cancel: CancellationToken,
        ) -> Result<()> {
            let mut streams = self.streams.lock().unwrap();
            let prior_closed = streams
                .last()
                .map(|s| s.cancel.is_cancelled())
                .unwrap_or(true);
            self.prior_stream_closed_at_open
                .lock()
                .unwrap()
                .push(prior_closed);
            streams.push(OpenedStream { tx: events, cancel });
            Ok(())
        }
    }

    impl MockConnector {
        fn open_count(&self) -> usize {
            self.streams.lock().unwrap().len()
        }

        fn stream_tx(&self, index: usize) -> mpsc::Sender<StreamEvent> {
            self.streams.lock().unwrap()[index].tx.clone()
        }

        fn last_tx(&self) -> mpsc::Sender<StreamEvent> {
            self.streams.lock().unwrap().last().unwrap().tx.clone()
        }

        fn last_cancelled(&self) -> bool {
            self.streams.lock().unwrap().last().unwrap().cancel.is_cancelled()
        }

        async fn emit(&self, payload: StreamPayload) {
            self.last_tx()
                .send(StreamEvent::Payload(payload))
                .await
                .unwrap();
        }

        async fn emit_error(&self, error: &str) {
            self.last_tx()
                .send(StreamEvent::TransportError(error.to_string()))
                .await
                .unwrap();
        }
    }

    struct Harness {
        connector: Arc<MockConnector>,
        sink: Arc<NotificationSink>,
        handle: SessionHandle,
        events: mpsc::Receiver<SessionDomainEvent>,
    }

    fn open_session() -> Harness {
        let connector = Arc::new(MockConnector::default());
        let sink = Arc::new(NotificationSink::new());
        let (handle, events) = SessionController::open(
            "1",
            connector.clone(),
            sink.clone(),
            ReopenPolicy::default(),
        );
        Harness {
            connector,
            sink,
            handle,
            events,
        }
    }

    async fn next_event(rx: &mut mpsc::Receiver<SessionDomainEvent>) -> SessionDomainEvent {
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for session event")
            .expect("session event channel closed")
    }

    #[tokio::test(start_paused = true)]
    async fn opening_connects_and_publishes_the_first_qr() {
        let mut h = open_session();
        assert_eq!(
            next_event(&mut h.events).await,
            SessionDomainEvent::StateChanged(SessionState::Connecting)
        );
        assert_eq!(h.connector.open_count(), 1);

        h.connector
            .emit(StreamPayload::Qr("img-ref".to_string()))
            .await;
        assert_eq!(
            next_event(&mut h.events).await,
            SessionDomainEvent::StateChanged(SessionState::AwaitingScan)
        );
        assert_eq!(
            next_event(&mut h.events).await,
            SessionDomainEvent::QrUpdated("img-ref".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn scan_reconnect_connect_flow_navigates_after_the_delay() {
        let mut h = open_session();
        next_event(&mut h.events).await; // Connecting

        h.connector
            .emit(StreamPayload::Qr("img-ref".to_string()))
            .await;
        next_event(&mut h.events).await; // AwaitingScan
        next_event(&mut h.events).await; // QrUpdated

        h.connector.emit(StreamPayload::Reconnecting).await;
        assert_eq!(
            next_event(&mut h.events).await,
            SessionDomainEvent::StateChanged(SessionState::Reconnecting)
        );

        h.connector.emit(StreamPayload::Connected).await;
        assert_eq!(
            next_event(&mut h.events).await,
            SessionDomainEvent::StateChanged(SessionState::Connected)
        );

        // The stream is torn down and exactly one success toast is up
        assert!(h.connector.last_cancelled());
        let toast = h.sink.current().expect("success toast");
        assert_eq!(toast.text, TOAST_CONNECTED);
        assert_eq!(toast.severity, Severity::Success);

        // Navigation fires only after the fixed redirect delay
        assert_eq!(
            next_event(&mut h.events).await,
            SessionDomainEvent::NavigateHome
        );
        assert_eq!(h.connector.open_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_reopens_a_fresh_stream_after_the_delay() {
        let mut h = open_session();
        next_event(&mut h.events).await; // Connecting
        h.connector
            .emit(StreamPayload::Qr("img-ref".to_string()))
            .await;
        next_event(&mut h.events).await; // AwaitingScan
        next_event(&mut h.events).await; // QrUpdated

        h.connector.emit(StreamPayload::Expired).await;
        assert_eq!(
            next_event(&mut h.events).await,
            SessionDomainEvent::StateChanged(SessionState::Expired)
        );
        assert!(h.connector.last_cancelled());
        assert_eq!(h.sink.current().expect("expiry toast").text, TOAST_EXPIRED);

        // Back to Connecting once the reopen delay elapses
        assert_eq!(
            next_event(&mut h.events).await,
            SessionDomainEvent::StateChanged(SessionState::Connecting)
        );
        assert_eq!(h.connector.open_count(), 2);
        // The old connection was already closed when the new one opened
        assert!(h
            .connector
            .prior_stream_closed_at_open
            .lock()
            .unwrap()
            .iter()
            .all(|&closed| closed));
    }

    #[tokio::test(start_paused = true)]
    async fn stale_events_from_a_closed_stream_are_dropped() {
        let mut h = open_session();
        next_event(&mut h.events).await; // Connecting
        h.connector
            .emit(StreamPayload::Qr("img-ref".to_string()))
            .await;
        next_event(&mut h.events).await;
        next_event(&mut h.events).await;

        h.connector.emit(StreamPayload::Expired).await;
        next_event(&mut h.events).await; // Expired

        // A late "Connected!" from the already-closed first stream
        let old_tx = h.connector.stream_tx(0);
        let _ = old_tx.send(StreamEvent::Payload(StreamPayload::Connected)).await;

        // The reopen still happens: next state is Connecting, not Connected
        assert_eq!(
            next_event(&mut h.events).await,
            SessionDomainEvent::StateChanged(SessionState::Connecting)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn closing_the_handle_cancels_a_pending_reopen() {
        let mut h = open_session();
        next_event(&mut h.events).await; // Connecting
        h.connector
            .emit(StreamPayload::Qr("img-ref".to_string()))
            .await;
        next_event(&mut h.events).await;
        next_event(&mut h.events).await;

        h.connector.emit(StreamPayload::Expired).await;
        next_event(&mut h.events).await; // Expired, reopen pending

        h.handle.close();
        assert!(h.handle.is_closed());
        h.handle.close(); // idempotent

        // Ride past the reopen delay: no new stream may appear
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(h.connector.open_count(), 1);
        assert!(h.connector.last_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_fails_the_session_and_refresh_recovers_it() {
        let mut h = open_session();
        next_event(&mut h.events).await; // Connecting
        h.connector
            .emit(StreamPayload::Qr("img-ref".to_string()))
            .await;
        next_event(&mut h.events).await;
        next_event(&mut h.events).await;

        h.connector.emit_error("connection reset").await;
        assert_eq!(
            next_event(&mut h.events).await,
            SessionDomainEvent::StateChanged(SessionState::Failed)
        );
        assert_eq!(h.sink.current().expect("error toast").severity, Severity::Error);

        // No automatic recovery from a transport drop
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(h.connector.open_count(), 1);

        // Manual retry restarts from Connecting
        h.handle.refresh().await.unwrap();
        assert_eq!(
            next_event(&mut h.events).await,
            SessionDomainEvent::StateChanged(SessionState::Connecting)
        );
        assert_eq!(h.connector.open_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_connected_markers_do_not_navigate_twice() {
        let mut h = open_session();
        next_event(&mut h.events).await; // Connecting
        h.connector
            .emit(StreamPayload::Qr("img-ref".to_string()))
            .await;
        next_event(&mut h.events).await;
        next_event(&mut h.events).await;

        // The backend may repeat the marker before the close takes effect
        let tx = h.connector.last_tx();
        tx.send(StreamEvent::Payload(StreamPayload::Connected))
            .await
            .unwrap();
        let _ = tx.send(StreamEvent::Payload(StreamPayload::Connected)).await;

        assert_eq!(
            next_event(&mut h.events).await,
            SessionDomainEvent::StateChanged(SessionState::Connected)
        );
        assert_eq!(
            next_event(&mut h.events).await,
            SessionDomainEvent::NavigateHome
        );
        // Nothing further: the channel stays quiet
        let quiet = timeout(Duration::from_secs(3), h.events.recv()).await;
        assert!(quiet.is_err(), "unexpected event {:?}", quiet);
    }
}
