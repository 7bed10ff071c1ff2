use serde::{Deserialize, Serialize};

/// Pairing session state machine
///
/// This is a pure type with only state definitions and classification
/// helpers. Runtime behaviors like timers and stream teardown are handled
/// by the controller layer (wadash).
///
/// State transitions:
/// ```text
///   Idle
///    │ open()
///    ▼
///   Connecting ──────── fresh QR ──────────► AwaitingScan
///                                              │    ▲
///                                "reconnecting"│    │ fresh QR
///                                              ▼    │
///                                            Reconnecting
///
///   AwaitingScan / Reconnecting + "connected" ─────► Connected (terminal)
///   AwaitingScan / Reconnecting + "expired"   ─────► Expired ── delay ──► Connecting
///   any non-terminal + transport error        ─────► Failed ── manual refresh ──► Connecting
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No pairing in progress
    Idle,

    /// Stream requested, waiting for the first QR payload
    Connecting,

    /// A QR code is on screen, waiting for the user to scan it
    AwaitingScan,

    /// Backend signalled it is re-establishing its upstream link
    Reconnecting,

    /// Pairing completed (terminal)
    Connected,

    /// The QR code expired; a fresh stream opens automatically
    Expired,

    /// The stream dropped; recovery requires a manual refresh
    Failed,
}

impl SessionState {
    /// Check if this is a terminal state (no more transitions possible)
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Check if a stream is (or is being) established in this state
    pub fn is_streaming(self) -> bool {
        matches!(self, Self::Connecting | Self::AwaitingScan | Self::Reconnecting)
    }

    /// Check if this state offers a recovery path back to `Connecting`
    pub fn is_recoverable(self) -> bool {
        matches!(self, Self::Expired | Self::Failed)
    }

    /// The status line shown next to this state.
    pub fn message(self) -> &'static str {
        match self {
            Self::Idle => "Waiting for connection...",
            Self::Connecting => "Connecting...",
            Self::AwaitingScan => "Scan this QR code to connect",
            Self::Reconnecting => "Reconnecting...",
            Self::Connected => "Connected!",
            Self::Expired => "QR Code Expired!",
            Self::Failed => "Failed to connect to the server. Please try again.",
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(SessionState::Connected.is_terminal());

        assert!(!SessionState::Idle.is_terminal());
        assert!(!SessionState::Connecting.is_terminal());
        assert!(!SessionState::AwaitingScan.is_terminal());
        assert!(!SessionState::Reconnecting.is_terminal());
        assert!(!SessionState::Expired.is_terminal());
        assert!(!SessionState::Failed.is_terminal());
    }

    #[test]
    fn test_streaming_states() {
        assert!(SessionState::Connecting.is_streaming());
        assert!(SessionState::AwaitingScan.is_streaming());
        assert!(SessionState::Reconnecting.is_streaming());

        assert!(!SessionState::Idle.is_streaming());
        assert!(!SessionState::Connected.is_streaming());
        assert!(!SessionState::Expired.is_streaming());
        assert!(!SessionState::Failed.is_streaming());
    }

    #[test]
    fn test_recoverable_states() {
        assert!(SessionState::Expired.is_recoverable());
        assert!(SessionState::Failed.is_recoverable());

        assert!(!SessionState::Connected.is_recoverable());
        assert!(!SessionState::AwaitingScan.is_recoverable());
    }
}
