//! The QR event stream transport.
//!
//! [`StreamConnector`] is the seam between the session controller and the
//! wire: production code uses the SSE-backed [`SseConnector`], tests plug in
//! channel-driven fakes.

pub mod sse;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use wd_core::StreamPayload;

use crate::error::Result;

pub use sse::{SseConnector, SseFrameDecoder};

/// What a stream delivers to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A decoded event from the backend.
    Payload(StreamPayload),
    /// The stream dropped (or ended) before a terminal marker.
    TransportError(String),
}

/// Opens push streams scoped to an account.
///
/// `open` resolves once the stream is established; after that, events flow
/// into `events` until the stream ends or `cancel` fires. Cancelling stops
/// event delivery promptly — nothing is sent after the token trips.
#[async_trait]
pub trait StreamConnector: Send + Sync {
    async fn open(
        &self,
        account_id: &str,
        events: mpsc::Sender<StreamEvent>,
        cancel: CancellationToken,
    ) -> Result<()>;
}
