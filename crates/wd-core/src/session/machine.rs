//! Pairing session state machine
//!
//! Pure functional state transitions: `(state, event) -> (new_state, actions)`.
//! The controller layer converts stream/timer/user input into [`SessionEvent`]s,
//! calls [`SessionStateMachine::handle_event`], and executes the returned
//! [`SessionAction`]s (open/close stream, start timers, raise toasts).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::action::SessionAction;
use super::event::SessionEvent;
use super::state::SessionState;
use crate::stream::StreamPayload;
use crate::toast::Severity;

/// Toast shown when the backend signals it is re-establishing its link.
pub const TOAST_RECONNECTING: &str = "Reconnecting to the server...";
/// Toast shown once when pairing completes.
pub const TOAST_CONNECTED: &str = "Connected successfully!";
/// Toast shown once per expiry event (not per reopen attempt).
pub const TOAST_EXPIRED: &str = "QR Code Expired! Generating new QR code...";
/// Toast shown when the stream drops without a terminal marker.
pub const TOAST_STREAM_FAILED: &str = "Connection error. Please try again.";
/// Toast shown when the automatic reopen budget is exhausted.
pub const TOAST_REOPEN_EXHAUSTED: &str = "QR code kept expiring. Please try again.";

/// Bounds on the automatic reopen-after-expiry loop.
///
/// The backend expires codes on a fixed cadence, so an unattended pairing
/// page would otherwise reopen streams forever. A manual refresh resets the
/// budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReopenPolicy {
    /// Consecutive automatic reopens allowed before the session fails.
    pub max_auto_reopens: u32,
}

impl Default for ReopenPolicy {
    fn default() -> Self {
        Self {
            max_auto_reopens: 30,
        }
    }
}

/// One pairing attempt for an account.
///
/// Owned exclusively by the state machine and mutated only by
/// [`SessionStateMachine::handle_event`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingSession {
    /// Account this attempt pairs.
    pub account_id: String,
    /// Unique id for this attempt, for log correlation.
    pub attempt_id: String,
    /// The QR payload currently on screen, if any.
    pub qr_payload: Option<String>,
    pub started_at: DateTime<Utc>,
    pub last_event_at: DateTime<Utc>,
}

/// The session state machine.
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use wd_core::session::{ReopenPolicy, SessionEvent, SessionState, SessionStateMachine};
///
/// let mut sm = SessionStateMachine::new("1", ReopenPolicy::default(), Utc::now());
/// let (state, actions) = sm.handle_event(SessionEvent::Open, Utc::now());
/// assert_eq!(state, SessionState::Connecting);
/// assert!(!actions.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    state: SessionState,
    session: PairingSession,
    policy: ReopenPolicy,
    /// Automatic reopens consumed since the last manual (re)start.
    auto_reopens: u32,
}

impl SessionStateMachine {
    pub fn new(account_id: impl Into<String>, policy: ReopenPolicy, now: DateTime<Utc>) -> Self {
        Self {
            state: SessionState::Idle,
            session: PairingSession {
                account_id: account_id.into(),
                attempt_id: uuid::Uuid::new_v4().to_string(),
                qr_payload: None,
                started_at: now,
                last_event_at: now,
            },
            policy,
            auto_reopens: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session(&self) -> &PairingSession {
        &self.session
    }

    /// Process an event and return the new state plus the side effects the
    /// controller must execute.
    ///
    /// Events that have no transition in the current state are ignored —
    /// logged, never fatal — which also makes duplicate marker delivery
    /// idempotent.
    pub fn handle_event(
        &mut self,
        event: SessionEvent,
        now: DateTime<Utc>,
    ) -> (SessionState, Vec<SessionAction>) {
        self.session.last_event_at = now;
        let (new_state, actions) = self.transition(event);

        #[cfg(feature = "tracing")]
        if new_state != self.state {
            tracing::debug!(
                attempt_id = %self.session.attempt_id,
                old_state = ?self.state,
                new_state = ?new_state,
                "session transition"
            );
        }

        self.state = new_state;
        (new_state, actions)
    }

    fn transition(&mut self, event: SessionEvent) -> (SessionState, Vec<SessionAction>) {
        match (self.state, event) {
            (SessionState::Idle, SessionEvent::Open) => {
                (SessionState::Connecting, vec![SessionAction::OpenStream])
            }

            // A fresh QR payload, whether the first one or a refresh.
            (
                SessionState::Connecting | SessionState::AwaitingScan | SessionState::Reconnecting,
                SessionEvent::PayloadReceived(StreamPayload::Qr(payload)),
            ) => {
                self.session.qr_payload = Some(payload.clone());
                (
                    SessionState::AwaitingScan,
                    vec![SessionAction::ShowQr { payload }],
                )
            }

            (
                SessionState::AwaitingScan,
                SessionEvent::PayloadReceived(StreamPayload::Reconnecting),
            ) => (
                SessionState::Reconnecting,
                vec![notify(TOAST_RECONNECTING, Severity::Info)],
            ),

            // The connected marker completes the flow from any non-terminal
            // state; repeat delivery lands in Connected and is ignored below.
            (state, SessionEvent::PayloadReceived(StreamPayload::Connected))
                if !state.is_terminal() =>
            {
                self.session.qr_payload = None;
                (
                    SessionState::Connected,
                    vec![
                        SessionAction::CancelTimers,
                        SessionAction::CloseStream,
                        notify(TOAST_CONNECTED, Severity::Success),
                        SessionAction::ScheduleRedirect,
                    ],
                )
            }

            (
                SessionState::AwaitingScan | SessionState::Reconnecting,
                SessionEvent::PayloadReceived(StreamPayload::Expired),
            ) => {
                self.session.qr_payload = None;
                if self.auto_reopens < self.policy.max_auto_reopens {
                    self.auto_reopens += 1;
                    (
                        SessionState::Expired,
                        vec![
                            SessionAction::CloseStream,
                            notify(TOAST_EXPIRED, Severity::Error),
                            SessionAction::ScheduleReopen,
                        ],
                    )
                } else {
                    (
                        SessionState::Failed,
                        vec![
                            SessionAction::CloseStream,
                            notify(TOAST_REOPEN_EXHAUSTED, Severity::Error),
                        ],
                    )
                }
            }

            (SessionState::Expired, SessionEvent::ReopenElapsed) => {
                (SessionState::Connecting, vec![SessionAction::OpenStream])
            }

            // Terminal follow-through: the redirect timer fires while Connected.
            (SessionState::Connected, SessionEvent::RedirectElapsed) => {
                (SessionState::Connected, vec![SessionAction::Navigate])
            }

            (state, SessionEvent::TransportError(error)) if !state.is_terminal() => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    attempt_id = %self.session.attempt_id,
                    %error,
                    "qr stream transport error"
                );
                #[cfg(not(feature = "tracing"))]
                let _ = error;
                self.session.qr_payload = None;
                (
                    SessionState::Failed,
                    vec![
                        SessionAction::CancelTimers,
                        SessionAction::CloseStream,
                        notify(TOAST_STREAM_FAILED, Severity::Error),
                    ],
                )
            }

            // Refresh restarts the flow from anywhere except Idle/Connected,
            // always tearing down the old stream first.
            (state, SessionEvent::ManualRefresh)
                if state.is_streaming() || state.is_recoverable() =>
            {
                self.auto_reopens = 0;
                self.session.qr_payload = None;
                (
                    SessionState::Connecting,
                    vec![
                        SessionAction::CancelTimers,
                        SessionAction::CloseStream,
                        SessionAction::OpenStream,
                    ],
                )
            }

            (state, event) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    attempt_id = %self.session.attempt_id,
                    ?state,
                    ?event,
                    "ignoring event with no transition"
                );
                #[cfg(not(feature = "tracing"))]
                let _ = event;
                (state, vec![])
            }
        }
    }
}

fn notify(text: &str, severity: Severity) -> SessionAction {
    SessionAction::Notify {
        text: text.to_string(),
        severity,
    }
}
