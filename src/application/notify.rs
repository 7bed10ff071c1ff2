//! Transient user-facing notifications.

use chrono::Utc;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::AbortHandle;

use wd_core::toast::TOAST_DURATION_SECS;
use wd_core::{Severity, ToastMessage};

/// Single-slot toast sink: the newest message replaces the current one, and
/// each message auto-dismisses after [`TOAST_DURATION_SECS`].
///
/// Purely presentational — it observes session transitions but never feeds
/// anything back into them.
pub struct NotificationSink {
    slot: watch::Sender<Option<ToastMessage>>,
    dismiss: Mutex<Option<AbortHandle>>,
}

impl NotificationSink {
    pub fn new() -> Self {
        let (slot, _) = watch::channel(None);
        Self {
            slot,
            dismiss: Mutex::new(None),
        }
    }

    /// Show a toast, replacing whatever is on screen.
    ///
    /// Must be called from within a Tokio runtime (the dismiss timer is a
    /// spawned task).
    pub fn notify(&self, text: impl Into<String>, severity: Severity) {
        let toast = ToastMessage::new(text, severity, Utc::now());
        self.slot.send_replace(Some(toast));

        let mut dismiss = self.dismiss.lock().expect("dismiss lock poisoned");
        if let Some(previous) = dismiss.take() {
            previous.abort();
        }
        let slot = self.slot.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(TOAST_DURATION_SECS as u64)).await;
            slot.send_replace(None);
        });
        *dismiss = Some(handle.abort_handle());
    }

    /// Watch the toast slot; `None` means nothing is on screen.
    pub fn subscribe(&self) -> watch::Receiver<Option<ToastMessage>> {
        self.slot.subscribe()
    }

    /// The toast currently on screen, if any.
    pub fn current(&self) -> Option<ToastMessage> {
        self.slot.borrow().clone()
    }
}

impl Default for NotificationSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn toast_auto_dismisses_after_display_duration() {
        let sink = NotificationSink::new();
        sink.notify("Connected successfully!", Severity::Success);
        assert_eq!(
            sink.current().map(|t| t.text),
            Some("Connected successfully!".to_string())
        );

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(sink.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn newest_toast_replaces_oldest_and_restarts_the_clock() {
        let sink = NotificationSink::new();
        sink.notify("first", Severity::Info);

        tokio::time::sleep(Duration::from_secs(2)).await;
        sink.notify("second", Severity::Error);
        assert_eq!(sink.current().map(|t| t.text), Some("second".to_string()));

        // The first toast's timer was aborted; the second gets a full window
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(sink.current().map(|t| t.text), Some("second".to_string()));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(sink.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_observe_show_and_dismiss() {
        let sink = NotificationSink::new();
        let mut rx = sink.subscribe();

        sink.notify("hello", Severity::Info);
        rx.changed().await.unwrap();
        assert_eq!(
            rx.borrow_and_update().as_ref().map(|t| t.text.clone()),
            Some("hello".to_string())
        );

        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_none());
    }
}
