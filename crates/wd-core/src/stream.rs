//! QR stream wire payloads.
//!
//! The backend multiplexes lifecycle signals and QR refreshes over a single
//! string field. Sentinel values are decoded exactly once, at the stream
//! boundary; everything downstream works with the tagged [`StreamPayload`].

use serde::{Deserialize, Serialize};

/// Sentinel sent when the account finished pairing.
const CONNECTED_MARKER: &str = "Connected!";
/// Sentinel sent while the backend re-establishes its upstream link.
const RECONNECTING_MARKER: &str = "Reconnecting!";
/// Substring marking an expired QR code (the full message wording varies).
const EXPIRED_MARKER: &str = "expired";

/// One event on the QR stream, as emitted by the backend.
///
/// Wire shape: `{"qrCode": "<payload>"}`.
#[derive(Debug, Clone, Deserialize)]
pub struct QrStreamFrame {
    #[serde(rename = "qrCode")]
    pub qr_code: String,
}

/// A decoded stream event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamPayload {
    /// A fresh renderable QR payload (image reference).
    Qr(String),
    /// Pairing completed; the stream will not produce further QR codes.
    Connected,
    /// The backend is re-establishing its upstream link; keep waiting.
    Reconnecting,
    /// The current QR code expired; a new stream must be opened.
    Expired,
}

impl StreamPayload {
    /// Decode a raw `qrCode` value into its tagged variant.
    ///
    /// `Connected!` and `Reconnecting!` are exact matches; expiry is a
    /// substring match because the backend embeds it in a longer message.
    pub fn decode(raw: &str) -> Self {
        if raw == CONNECTED_MARKER {
            Self::Connected
        } else if raw == RECONNECTING_MARKER {
            Self::Reconnecting
        } else if raw.contains(EXPIRED_MARKER) {
            Self::Expired
        } else {
            Self::Qr(raw.to_string())
        }
    }

    /// Whether this payload ends the stream's useful life.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Connected | Self::Expired)
    }
}

impl From<QrStreamFrame> for StreamPayload {
    fn from(frame: QrStreamFrame) -> Self {
        Self::decode(&frame.qr_code)
    }
}
