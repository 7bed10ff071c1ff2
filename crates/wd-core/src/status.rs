//! Connection status and account profile snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A point-in-time view of the bot's connection, as reported by the backend.
///
/// Immutable once fetched; a newer fetch supersedes it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    #[serde(rename = "isConnected")]
    pub is_connected: bool,
    #[serde(rename = "lastConnected", default)]
    pub last_connected_at: Option<DateTime<Utc>>,
    #[serde(rename = "lastDisconnected", default)]
    pub last_disconnected_at: Option<DateTime<Utc>>,
}

impl ConnectionStatus {
    pub fn disconnected() -> Self {
        Self {
            is_connected: false,
            last_connected_at: None,
            last_disconnected_at: None,
        }
    }
}

/// The linked account's profile.
///
/// The backend reports `isLoggedIn` as a 0/1 integer rather than a boolean.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountProfile {
    pub name: String,
    pub number: String,
    pub avatar: String,
    #[serde(rename = "isLoggedIn")]
    pub is_logged_in: u8,
}

impl AccountProfile {
    /// Whether the dashboard should demand a fresh login: the stored
    /// credentials are gone and the bot is not connected either.
    pub fn needs_relogin(&self, status: &ConnectionStatus) -> bool {
        self.is_logged_in == 0 && !status.is_connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(is_logged_in: u8) -> AccountProfile {
        AccountProfile {
            name: "Bot".to_string(),
            number: "+12345678901".to_string(),
            avatar: "https://example.com/avatar.png".to_string(),
            is_logged_in,
        }
    }

    #[test]
    fn status_deserializes_wire_field_names() {
        let status: ConnectionStatus = serde_json::from_str(
            r#"{"isConnected":true,"lastConnected":"2024-05-01T12:00:00Z"}"#,
        )
        .unwrap();
        assert!(status.is_connected);
        assert!(status.last_connected_at.is_some());
        assert!(status.last_disconnected_at.is_none());
    }

    #[test]
    fn relogin_needed_only_when_logged_out_and_disconnected() {
        let disconnected = ConnectionStatus::disconnected();
        let connected = ConnectionStatus {
            is_connected: true,
            ..ConnectionStatus::disconnected()
        };

        assert!(profile(0).needs_relogin(&disconnected));
        assert!(!profile(0).needs_relogin(&connected));
        assert!(!profile(1).needs_relogin(&disconnected));
    }
}
