use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::RwLock;

// Global settings instance
pub static SETTINGS: Lazy<RwLock<Settings>> = Lazy::new(|| RwLock::new(Settings::default()));

// Backend server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSetting {
    // Base URL of the bot backend, e.g. "http://localhost:3001"
    pub base_url: String,
    // Per-request timeout for one-shot calls (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    // Connect timeout for the long-lived QR stream (seconds)
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_connect_timeout_secs() -> u64 {
    5
}

// Pairing session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSetting {
    // Account the dashboard administers
    #[serde(default = "default_account_id")]
    pub account_id: String,
    // Consecutive automatic stream reopens allowed after QR expiry
    #[serde(default = "default_max_auto_reopens")]
    pub max_auto_reopens: u32,
}

fn default_account_id() -> String {
    "1".to_string()
}

fn default_max_auto_reopens() -> u32 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerSetting,
    #[serde(default)]
    pub session: SessionSetting,
}

impl Default for ServerSetting {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001".to_string(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Default for SessionSetting {
    fn default() -> Self {
        Self {
            account_id: default_account_id(),
            max_auto_reopens: default_max_auto_reopens(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSetting::default(),
            session: SessionSetting::default(),
        }
    }
}

impl Settings {
    /// Parse settings from a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("Failed to parse settings")
    }

    /// Load settings from a TOML file on disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read settings file {:?}", path.as_ref()))?;
        Self::from_toml_str(&raw)
    }

    /// Snapshot the global settings.
    pub fn get_instance() -> Self {
        SETTINGS.read().expect("settings lock poisoned").clone()
    }

    /// Replace the global settings.
    pub fn apply(self) {
        *SETTINGS.write().expect("settings lock poisoned") = self;
    }

    pub fn reopen_policy(&self) -> wd_core::ReopenPolicy {
        wd_core::ReopenPolicy {
            max_auto_reopens: self.session.max_auto_reopens,
        }
    }
}
