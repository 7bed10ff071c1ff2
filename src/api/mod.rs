//! One-shot HTTP calls against the bot backend.
//!
//! Every operation here is a plain request/response exchange; none of them
//! retry on failure — callers decide. The long-lived QR stream lives in
//! [`crate::stream`] instead.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use wd_core::{AccountProfile, ConnectionStatus, PairingCode, PhoneNumber};

use crate::config::ServerSetting;
use crate::error::{AppError, Result};

/// Wire envelope for `GET /whatsapp/status/{id}`.
#[derive(Debug, Deserialize)]
struct StatusEnvelope {
    status: ConnectionStatus,
}

/// Wire body for `POST /whatsapp/generate-pairing-code`.
#[derive(Debug, Serialize)]
struct PairingCodeRequest<'a> {
    #[serde(rename = "userId")]
    user_id: &'a str,
    #[serde(rename = "phoneNumber")]
    phone_number: String,
}

#[derive(Debug, Deserialize)]
struct PairingCodeResponse {
    #[serde(rename = "pairingCode")]
    pairing_code: PairingCode,
}

/// Error body the backend attaches to rejected requests.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Wire body for `POST /whatsapp/connect`.
#[derive(Debug, Serialize)]
struct ConnectRequest<'a> {
    #[serde(rename = "userId")]
    user_id: &'a str,
}

/// HTTP client for the bot backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(server: &ServerSetting) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(server.request_timeout_secs))
            .build()
            .map_err(|e| AppError::internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: server.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Fetch the current connection snapshot. No retries, no caching.
    pub async fn fetch_status(&self, account_id: &str) -> Result<ConnectionStatus> {
        let url = self.url(&format!("whatsapp/status/{}", account_id));
        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::network(format!(
                "status request failed with HTTP {}",
                response.status()
            )));
        }
        let body = response.text().await?;
        let envelope: StatusEnvelope = serde_json::from_str(&body)?;
        debug!(
            "fetched status for account {}: connected={}",
            account_id, envelope.status.is_connected
        );
        Ok(envelope.status)
    }

    /// Fetch the linked account's profile.
    pub async fn fetch_profile(&self, account_id: &str) -> Result<AccountProfile> {
        let url = self.url(&format!("whatsapp/user/{}", account_id));
        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::network(format!(
                "profile request failed with HTTP {}",
                response.status()
            )));
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Request a one-time pairing code for a validated phone number.
    ///
    /// A backend rejection with a message body surfaces as a validation
    /// error so the UI can show it verbatim.
    pub async fn generate_pairing_code(
        &self,
        account_id: &str,
        phone: &PhoneNumber,
    ) -> Result<PairingCode> {
        let url = self.url("whatsapp/generate-pairing-code");
        let request = PairingCodeRequest {
            user_id: account_id,
            phone_number: phone.to_wire(),
        };
        let response = self.http.post(&url).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return match serde_json::from_str::<ErrorBody>(&body) {
                Ok(err) => Err(AppError::validation(err.message)),
                Err(_) => Err(AppError::network(format!(
                    "pairing code request failed with HTTP {}",
                    status
                ))),
            };
        }

        let parsed: PairingCodeResponse = serde_json::from_str(&body)?;
        info!("pairing code issued for account {}", account_id);
        Ok(parsed.pairing_code)
    }

    /// Ask the backend to bring the bot connection up. Fire-and-forget.
    pub async fn connect(&self, account_id: &str) -> Result<()> {
        let url = self.url("whatsapp/connect");
        let request = ConnectRequest {
            user_id: account_id,
        };
        let response = self.http.post(&url).json(&request).send().await?;
        Self::expect_success("connect", response.status())
    }

    /// Ask the backend to drop the bot connection. Fire-and-forget.
    pub async fn close_connection(&self, account_id: &str) -> Result<()> {
        let url = self.url(&format!("whatsapp/close-connection/{}", account_id));
        let response = self.http.post(&url).send().await?;
        Self::expect_success("close-connection", response.status())
    }

    /// Log the account out of the backend. Fire-and-forget.
    pub async fn logout(&self, account_id: &str) -> Result<()> {
        let url = self.url(&format!("whatsapp/logout/{}", account_id));
        let response = self.http.post(&url).send().await?;
        Self::expect_success("logout", response.status())
    }

    fn expect_success(op: &str, status: reqwest::StatusCode) -> Result<()> {
        if status.is_success() {
            Ok(())
        } else {
            Err(AppError::network(format!(
                "{} request failed with HTTP {}",
                op, status
            )))
        }
    }
}
