//! The one-time pairing code issued by the backend.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

/// Pairing codes are always exactly eight characters.
pub const PAIRING_CODE_LEN: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PairingCodeError {
    #[error("pairing code must be {PAIRING_CODE_LEN} characters, got {0}")]
    WrongLength(usize),
    #[error("pairing code contains non-alphanumeric character {0:?}")]
    InvalidCharacter(char),
}

/// An eight-character alphanumeric pairing code.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct PairingCode(String);

impl PairingCode {
    /// The individual characters in display order, for boxed rendering.
    pub fn cells(&self) -> [char; PAIRING_CODE_LEN] {
        let mut cells = [' '; PAIRING_CODE_LEN];
        for (slot, c) in cells.iter_mut().zip(self.0.chars()) {
            *slot = c;
        }
        cells
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PairingCode {
    type Err = PairingCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let len = s.chars().count();
        if len != PAIRING_CODE_LEN {
            return Err(PairingCodeError::WrongLength(len));
        }
        if let Some(bad) = s.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(PairingCodeError::InvalidCharacter(bad));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for PairingCode {
    type Error = PairingCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for PairingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
