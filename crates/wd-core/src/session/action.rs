use serde::{Deserialize, Serialize};

use crate::toast::Severity;

/// Delay before the dashboard navigates away after a successful pairing.
pub const REDIRECT_DELAY_SECS: u64 = 2;
/// Delay before a fresh stream is opened after the backend expires a QR code.
pub const REOPEN_DELAY_SECS: u64 = 2;

/// The delayed follow-ups a session can have in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimerKind {
    /// Auto-reopen after expiry ([`REOPEN_DELAY_SECS`]).
    Reopen,
    /// Navigate away after connecting ([`REDIRECT_DELAY_SECS`]).
    Redirect,
}

/// A side effect requested by a state transition.
///
/// The state machine stays pure; the controller executes these against the
/// stream, the timer set, and the notification sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionAction {
    /// Open a fresh event stream (closing any current one first).
    OpenStream,

    /// Tear down the current event stream.
    CloseStream,

    /// Start the auto-reopen timer.
    ScheduleReopen,

    /// Start the post-connect redirect timer.
    ScheduleRedirect,

    /// Abort every pending timer.
    CancelTimers,

    /// Hand a fresh QR payload to the UI.
    ShowQr { payload: String },

    /// Navigate away from the pairing page.
    Navigate,

    /// Raise a toast.
    Notify { text: String, severity: Severity },
}
