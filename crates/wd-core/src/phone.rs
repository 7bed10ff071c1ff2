//! Phone number canonicalization for the pairing-code flow.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Maximum digits for a dialable number.
const MAX_DIGITS: usize = 15;
/// Minimum digits for a dialable number.
const MIN_DIGITS: usize = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PhoneNumberError {
    #[error("phone number must contain at least {MIN_DIGITS} digits, got {0}")]
    TooShort(usize),
    #[error("phone number must contain at most {MAX_DIGITS} digits, got {0}")]
    TooLong(usize),
}

/// A canonical phone number: 10 to 15 digits, no separators.
///
/// Validity is a pure function of the raw input; callers re-run
/// [`PhoneNumber::parse`] on every keystroke instead of tracking a dirty
/// flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Reduce raw user input to a canonical digit string.
    ///
    /// Non-digit characters (separators, a leading `+`) are stripped; what
    /// remains must be 10 to 15 digits.
    pub fn parse(raw: &str) -> Result<Self, PhoneNumberError> {
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.len() < MIN_DIGITS {
            return Err(PhoneNumberError::TooShort(digits.len()));
        }
        if digits.len() > MAX_DIGITS {
            return Err(PhoneNumberError::TooLong(digits.len()));
        }
        Ok(Self(digits))
    }

    /// The bare digit string.
    pub fn digits(&self) -> &str {
        &self.0
    }

    /// The wire form the backend expects: `+<digits>`.
    pub fn to_wire(&self) -> String {
        format!("+{}", self.0)
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{}", self.0)
    }
}
