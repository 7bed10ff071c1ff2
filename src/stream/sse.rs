//! Server-sent-events transport for the QR stream.

use async_trait::async_trait;
use futures_util::StreamExt;
use log::{debug, warn};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use wd_core::stream::QrStreamFrame;

use super::{StreamConnector, StreamEvent};
use crate::config::ServerSetting;
use crate::error::{AppError, Result};

/// Incremental SSE frame decoder.
///
/// Feed raw body chunks in whatever fragmentation the transport produces;
/// complete event payloads come back out. Only the `data` field matters for
/// this protocol: `:` comments and other fields are skipped, CRLF line
/// endings are accepted, and multi-line data is joined with `\n` per the
/// SSE spec.
#[derive(Debug, Default)]
pub struct SseFrameDecoder {
    buf: Vec<u8>,
    data_lines: Vec<String>,
}

impl SseFrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a chunk and return every event payload it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = &line[..line.len() - 1];
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            self.handle_line(line, &mut events);
        }
        events
    }

    fn handle_line(&mut self, line: &[u8], events: &mut Vec<String>) {
        // A blank line terminates the pending event
        if line.is_empty() {
            if !self.data_lines.is_empty() {
                events.push(self.data_lines.join("\n"));
                self.data_lines.clear();
            }
            return;
        }

        let line = String::from_utf8_lossy(line);
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line.as_ref(), ""),
        };
        if field == "data" {
            self.data_lines.push(value.to_string());
        }
        // event/id/retry fields are not used by this protocol
    }
}

/// Production [`StreamConnector`]: `GET /whatsapp/qr-stream/{account_id}`
/// read as a server-sent-events body.
#[derive(Debug, Clone)]
pub struct SseConnector {
    http: reqwest::Client,
    base_url: String,
}

impl SseConnector {
    pub fn new(server: &ServerSetting) -> Result<Self> {
        // No total request timeout: the stream is long-lived by design.
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(server.connect_timeout_secs))
            .build()
            .map_err(|e| AppError::internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: server.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl StreamConnector for SseConnector {
    async fn open(
        &self,
        account_id: &str,
        events: mpsc::Sender<StreamEvent>,
        cancel: CancellationToken,
    ) -> Result<()> {
        let url = format!("{}/whatsapp/qr-stream/{}", self.base_url, account_id);
        let response = self
            .http
            .get(&url)
            .header("accept", "text/event-stream")
            .send()
            .await
            .map_err(|e| AppError::stream(e.to_string()))?;
        if !response.status().is_success() {
            return Err(AppError::stream(format!(
                "qr stream request failed with HTTP {}",
                response.status()
            )));
        }

        debug!("qr stream established for account {}", account_id);
        tokio::spawn(read_stream(response, events, cancel));
        Ok(())
    }
}

/// Pump the SSE body into the event channel until EOF, error or cancel.
async fn read_stream(
    response: reqwest::Response,
    events: mpsc::Sender<StreamEvent>,
    cancel: CancellationToken,
) {
    let mut body = response.bytes_stream();
    let mut decoder = SseFrameDecoder::new();

    loop {
        let chunk = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("qr stream reader cancelled");
                return;
            }
            chunk = body.next() => chunk,
        };

        match chunk {
            Some(Ok(bytes)) => {
                for data in decoder.feed(&bytes) {
                    match serde_json::from_str::<QrStreamFrame>(&data) {
                        Ok(frame) => {
                            if events.send(StreamEvent::Payload(frame.into())).await.is_err() {
                                return;
                            }
                        }
                        Err(e) => warn!("discarding undecodable stream event: {}", e),
                    }
                }
            }
            Some(Err(e)) => {
                let _ = events
                    .send(StreamEvent::TransportError(e.to_string()))
                    .await;
                return;
            }
            // EOF without a terminal marker is a transport-level drop
            None => {
                let _ = events
                    .send(StreamEvent::TransportError(
                        "stream closed by server".to_string(),
                    ))
                    .await;
                return;
            }
        }
    }
}
