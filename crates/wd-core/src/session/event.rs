use serde::{Deserialize, Serialize};

use crate::stream::StreamPayload;

/// An input that can drive the session state machine.
///
/// Stream payloads, timer expirations and user input all funnel through
/// this one type; the machine decides what each means in its current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// The controller was asked to start pairing.
    Open,

    /// A decoded event arrived on the QR stream.
    PayloadReceived(StreamPayload),

    /// The stream dropped before a terminal marker was delivered.
    TransportError(String),

    /// The post-expiry reopen delay elapsed.
    ReopenElapsed,

    /// The post-connect redirect delay elapsed.
    RedirectElapsed,

    /// The user pressed the refresh / try-again affordance.
    ManualRefresh,
}
