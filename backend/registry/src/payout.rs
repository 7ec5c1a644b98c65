//! Payout destinations.
//!
//! A contributor supplies one free-form descriptor. It is parsed exactly once,
//! when the record is created, and every later step works on the tagged value.

use serde::{Deserialize, Serialize};

use crate::errors::{RegistryError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum PayoutDestination {
    /// Bank / UPI identifier (`name@bank`).
    Bank {
        #[serde(rename = "upiId")]
        upi_id: String,
    },
    /// Wallet address receiving on-chain credits.
    Chain { address: String },
}

/// How a transfer was settled, as recorded on the transfer ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoutMode {
    Bank,
    Crypto,
}

impl PayoutDestination {
    /// Purely syntactic routing: contains `@` → bank, starts with `0x` →
    /// chain, anything else is refused.
    pub fn parse(descriptor: &str) -> Result<Self> {
        let descriptor = descriptor.trim();
        if descriptor.contains('@') {
            Ok(Self::Bank {
                upi_id: descriptor.to_string(),
            })
        } else if descriptor.starts_with("0x") {
            Ok(Self::Chain {
                address: descriptor.to_string(),
            })
        } else {
            Err(RegistryError::InvalidPayout(format!(
                "'{descriptor}' is neither a UPI id (contains '@') nor a wallet address (starts with '0x')"
            )))
        }
    }

    /// Parse an optional descriptor; blank means "not provided yet".
    pub fn parse_optional(descriptor: Option<&str>) -> Result<Option<Self>> {
        match descriptor.map(str::trim) {
            None | Some("") => Ok(None),
            Some(d) => Self::parse(d).map(Some),
        }
    }

    pub fn mode(&self) -> PayoutMode {
        match self {
            Self::Bank { .. } => PayoutMode::Bank,
            Self::Chain { .. } => PayoutMode::Crypto,
        }
    }
}
