//! Application configuration loaded from environment variables.

use std::time::Duration;

use crate::errors::{RegistryError, Result};

/// Contract the portals were deployed against.
const DEFAULT_LEDGER_CONTRACT: &str = "0x1448d4966Cf9748f708ef4607BE5685f0e9AF0B9";

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database holding the document tree
    pub database_url: String,
    /// Size of the SQLite connection pool
    pub db_max_connections: u32,
    /// Port for the REST API server
    pub api_port: u16,
    /// How often (in seconds) the sweeper runs the scheduled transitions
    pub sweep_interval_secs: u64,
    /// Factor applied to unknown or missing waste categories
    pub default_category_factor: f64,
    /// Ledger gateway JSON-RPC endpoint; chain payouts are refused when unset
    pub ledger_rpc_url: Option<String>,
    /// Carbon credit contract address passed with every `registerProject`
    pub ledger_contract_address: String,
    /// Request timeout for ledger calls
    pub ledger_timeout_secs: u64,
    /// Delay between transaction receipt polls
    pub ledger_confirm_poll_ms: u64,
    /// Receipt polls before a pending transaction is reported as unconfirmed
    pub ledger_confirm_attempts: u32,
    /// Age (in seconds) after which an unreleased payout claim may be taken over
    pub claim_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            database_url: env_var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./carbon_registry.db".to_string()),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", "5")?,
            api_port: parse_var("API_PORT", "3001")?,
            sweep_interval_secs: parse_var("SWEEP_INTERVAL_SECS", "10")?,
            default_category_factor: parse_var("DEFAULT_CATEGORY_FACTOR", "0.1")?,
            ledger_rpc_url: env_var("LEDGER_RPC_URL").ok().filter(|s| !s.is_empty()),
            ledger_contract_address: env_var("LEDGER_CONTRACT_ADDRESS")
                .unwrap_or_else(|_| DEFAULT_LEDGER_CONTRACT.to_string()),
            ledger_timeout_secs: parse_var("LEDGER_TIMEOUT_SECS", "30")?,
            ledger_confirm_poll_ms: parse_var("LEDGER_CONFIRM_POLL_MS", "2000")?,
            ledger_confirm_attempts: parse_var("LEDGER_CONFIRM_ATTEMPTS", "30")?,
            claim_timeout_secs: parse_var("CLAIM_TIMEOUT_SECS", "1800")?,
        })
    }

    /// Reject settings that would only fail later, mid-transition.
    pub fn validate(&self) -> Result<()> {
        if self.db_max_connections == 0 {
            return Err(RegistryError::Config(
                "DB_MAX_CONNECTIONS must be at least 1".to_string(),
            ));
        }

        if self.sweep_interval_secs == 0 {
            return Err(RegistryError::Config(
                "SWEEP_INTERVAL_SECS must be at least 1".to_string(),
            ));
        }

        if !self.default_category_factor.is_finite() || self.default_category_factor < 0.0 {
            return Err(RegistryError::Config(
                "DEFAULT_CATEGORY_FACTOR must be a non-negative number".to_string(),
            ));
        }

        if let Some(url) = &self.ledger_rpc_url {
            if !url.starts_with("http") {
                return Err(RegistryError::Config(
                    "LEDGER_RPC_URL must be a valid HTTP(S) URL".to_string(),
                ));
            }
        }

        if !self.ledger_contract_address.starts_with("0x") {
            return Err(RegistryError::Config(
                "LEDGER_CONTRACT_ADDRESS must be a 0x-prefixed address".to_string(),
            ));
        }

        // A live payout must never look abandoned.
        let calls = u64::from(self.ledger_confirm_attempts) + 1;
        let confirm_window_ms = self.ledger_timeout_secs * 1000 * calls
            + self.ledger_confirm_poll_ms * u64::from(self.ledger_confirm_attempts);
        if self.claim_timeout_secs.saturating_mul(1000) <= confirm_window_ms {
            return Err(RegistryError::Config(
                "CLAIM_TIMEOUT_SECS must exceed the ledger confirmation window".to_string(),
            ));
        }

        Ok(())
    }

    pub fn claim_timeout(&self) -> Duration {
        Duration::from_secs(self.claim_timeout_secs)
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| RegistryError::Config(format!("Missing env var: {key}")))
}

fn parse_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T> {
    env_var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| RegistryError::Config(format!("Invalid {key}")))
}
