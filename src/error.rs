//! Unified error type system for the WaDash session controller.
//!
//! This module provides a centralized error handling approach, replacing
//! scattered String-based error returns with a typed `AppError` enum.
//!
//! # Design Philosophy
//!
//! - **Typed errors**: Each error variant represents a specific failure scenario
//! - **Context preservation**: Errors carry relevant context for debugging
//! - **Easy conversion**: Automatic conversions from common error types (reqwest, serde_json)
//! - **User-friendly**: String representations are suitable for displaying to users

use std::fmt;

/// Unified application error type.
///
/// Organized along the failure taxonomy of the controller: local validation,
/// transport failures, malformed responses, mid-stream drops, configuration.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Input rejected before any request is made (phone number, in-flight
    /// guard), or rejected by the backend with a user-facing message
    Validation(String),

    /// Transport/connectivity failure on a one-shot request
    Network(String),

    /// A response arrived but was not well-formed or had an unexpected shape
    Protocol(String),

    /// The QR event stream dropped or could not be established
    Stream(String),

    /// Configuration errors (loading, parsing, validation)
    Config(String),

    /// Generic/internal errors that don't fit other categories
    Internal(String),
}

impl AppError {
    /// Create a validation error with a message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a network error with a message.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a protocol error with a message.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a stream error with a message.
    pub fn stream(msg: impl Into<String>) -> Self {
        Self::Stream(msg.into())
    }

    /// Create a config error with a message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error with a message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the error was detected locally, before any request was made.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::Network(msg) => write!(f, "Network error: {}", msg),
            AppError::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            AppError::Stream(msg) => write!(f, "Stream error: {}", msg),
            AppError::Config(msg) => write!(f, "Config error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol(err.to_string())
    }
}

impl From<wd_core::PhoneNumberError> for AppError {
    fn from(err: wd_core::PhoneNumberError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<wd_core::PairingCodeError> for AppError {
    fn from(err: wd_core::PairingCodeError) -> Self {
        Self::Protocol(err.to_string())
    }
}

/// Convenience result type used across the crate.
pub type Result<T> = std::result::Result<T, AppError>;
