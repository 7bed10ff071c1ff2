//! Ephemeral user-facing status messages.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How long a toast stays on screen.
pub const TOAST_DURATION_SECS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    #[serde(rename = "success")]
    Success,
    #[serde(rename = "error")]
    Error,
    #[serde(rename = "info")]
    Info,
}

/// A transient notification. At most one is visible at a time; the newest
/// replaces the oldest and each self-destructs after [`TOAST_DURATION_SECS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToastMessage {
    pub text: String,
    pub severity: Severity,
    pub expires_at: DateTime<Utc>,
}

impl ToastMessage {
    pub fn new(text: impl Into<String>, severity: Severity, now: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            severity,
            expires_at: now + Duration::seconds(TOAST_DURATION_SECS),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
