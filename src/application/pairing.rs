//! Pairing-code request flow.

use log::warn;
use std::sync::atomic::{AtomicBool, Ordering};

use wd_core::{PairingCode, PhoneNumber};

use crate::api::ApiClient;
use crate::error::{AppError, Result};

/// Requests one-time pairing codes, enforcing the single-flight rule:
/// at most one outstanding request; a second call while one is pending is
/// rejected, never coalesced. Failures are terminal for the attempt — the
/// user retriggers manually.
pub struct PairingService {
    api: ApiClient,
    in_flight: AtomicBool,
}

impl PairingService {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Whether raw input currently constitutes a requestable phone number.
    /// Drives the request button's enabled state.
    pub fn is_valid_phone(raw: &str) -> bool {
        PhoneNumber::parse(raw).is_ok()
    }

    /// Validate the phone locally, then request a code from the backend.
    ///
    /// Invalid input never reaches the network.
    pub async fn request_code(&self, account_id: &str, raw_phone: &str) -> Result<PairingCode> {
        let phone = PhoneNumber::parse(raw_phone)?;

        if self.in_flight.swap(true, Ordering::SeqCst) {
            warn!("rejected concurrent pairing code request");
            return Err(AppError::validation(
                "a pairing code request is already in progress",
            ));
        }
        let result = self.api.generate_pairing_code(account_id, &phone).await;
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerSetting;

    fn service_for(server: &mockito::Server) -> PairingService {
        let api = ApiClient::new(&ServerSetting {
            base_url: server.url(),
            ..ServerSetting::default()
        })
        .unwrap();
        PairingService::new(api)
    }

    #[tokio::test]
    async fn malformed_phone_never_reaches_the_backend() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/whatsapp/generate-pairing-code")
            .expect(0)
            .create_async()
            .await;

        let service = service_for(&server);
        for raw in ["123456789", "1234567890123456789", "no-digits-here", ""] {
            let err = service.request_code("1", raw).await.unwrap_err();
            assert!(err.is_validation(), "input {:?} gave {:?}", raw, err);
        }

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn eleven_digit_number_passes_validation_and_returns_the_code() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/whatsapp/generate-pairing-code")
            .with_status(200)
            .with_body(r#"{"pairingCode":"A1B2C3D4"}"#)
            .create_async()
            .await;

        let service = service_for(&server);
        let code = service.request_code("1", "12345678901").await.unwrap();
        assert_eq!(code.cells(), ['A', '1', 'B', '2', 'C', '3', 'D', '4']);
    }

    #[tokio::test]
    async fn second_request_is_rejected_while_one_is_pending() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/whatsapp/generate-pairing-code")
            .expect(0)
            .create_async()
            .await;

        let service = service_for(&server);
        service.in_flight.store(true, Ordering::SeqCst);

        let err = service.request_code("1", "12345678901").await.unwrap_err();
        assert!(err.is_validation());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn in_flight_flag_is_released_after_a_failure() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/whatsapp/generate-pairing-code")
            .with_status(400)
            .with_body(r#"{"message":"Invalid phone number"}"#)
            .expect(2)
            .create_async()
            .await;

        let service = service_for(&server);
        // No automatic retry: each attempt is user-triggered, and the guard
        // must not stay latched after the first failure
        service.request_code("1", "12345678901").await.unwrap_err();
        service.request_code("1", "12345678901").await.unwrap_err();

        mock.assert_async().await;
    }

    #[test]
    fn button_enablement_tracks_validity() {
        assert!(PairingService::is_valid_phone("12345678901"));
        assert!(PairingService::is_valid_phone("+1 (234) 567-8901"));
        assert!(!PairingService::is_valid_phone("123"));
    }
}
