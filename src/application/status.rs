//! Process-wide connection status view.
//!
//! Multiple pages render the same connection state. Instead of each view
//! polling the backend independently (and disagreeing), everything reads
//! through this one cache, which is explicitly invalidated by the toggle
//! actions that can change the answer.

use log::info;
use tokio::sync::RwLock;

use wd_core::{AccountProfile, ConnectionStatus};

use crate::api::ApiClient;
use crate::error::Result;

pub struct StatusService {
    api: ApiClient,
    account_id: String,
    cached: RwLock<Option<ConnectionStatus>>,
}

impl StatusService {
    pub fn new(api: ApiClient, account_id: impl Into<String>) -> Self {
        Self {
            api,
            account_id: account_id.into(),
            cached: RwLock::new(None),
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// The latest known status, fetching only when the cache is empty.
    pub async fn current(&self) -> Result<ConnectionStatus> {
        if let Some(status) = self.cached.read().await.clone() {
            return Ok(status);
        }
        self.refresh().await
    }

    /// Bypass the cache and fetch a fresh snapshot.
    pub async fn refresh(&self) -> Result<ConnectionStatus> {
        let status = self.api.fetch_status(&self.account_id).await?;
        *self.cached.write().await = Some(status.clone());
        Ok(status)
    }

    /// Drop the cached snapshot so the next read hits the backend.
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }

    /// Used by pages that redirect away when the bot is already connected.
    pub async fn is_connected(&self) -> Result<bool> {
        Ok(self.current().await?.is_connected)
    }

    /// Flip the bot connection and return the fresh status.
    ///
    /// The cache is invalidated before re-reading so every other view picks
    /// up the change.
    pub async fn toggle_bot(&self) -> Result<ConnectionStatus> {
        let connected = self.current().await?.is_connected;
        if connected {
            info!("stopping bot for account {}", self.account_id);
            self.api.close_connection(&self.account_id).await?;
        } else {
            info!("starting bot for account {}", self.account_id);
            self.api.connect(&self.account_id).await?;
        }
        self.invalidate().await;
        self.refresh().await
    }

    /// Log the account out and forget the cached status.
    pub async fn logout(&self) -> Result<()> {
        self.api.logout(&self.account_id).await?;
        self.invalidate().await;
        Ok(())
    }

    /// Profile display data. Never cached — the dashboard fetches it
    /// alongside the status on mount.
    pub async fn profile(&self) -> Result<AccountProfile> {
        self.api.fetch_profile(&self.account_id).await
    }
}
