//! Ledger gateway client. Issues carbon credits on chain.
//!
//! The carbon credit contract exposes a single entry point,
//! `registerProject(owner, dataHash, credits, projectType) -> txHash`. The
//! gateway wraps it in JSON-RPC 2.0:
//!
//! | Method                  | Params                                              | Result                     |
//! |-------------------------|-----------------------------------------------------|----------------------------|
//! | `registerProject`       | `contract, owner, dataHash, credits, projectType`   | `{ hash }`                 |
//! | `getTransactionReceipt` | `hash`                                              | `null` or `{ status }`     |
//!
//! Submission and confirmation are separate calls so the caller can record
//! the hash before waiting on it. A credit is only considered issued once the
//! receipt reports `success`. Failures are surfaced to the caller as-is;
//! nothing is retried.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::errors::{RegistryError, Result};

/// Mirrors the contract's `enum ProjectType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ProjectType {
    Plantation = 0,
    Waste = 1,
    // Not issued by this service yet.
    #[allow(dead_code)]
    Hybrid = 2,
}

/// Settled state of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOutcome {
    Confirmed,
    Reverted,
}

/// Arguments of one `registerProject` call.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterProject {
    /// Wallet address that receives the credits.
    pub owner: String,
    /// JSON description of the credited record.
    pub data_hash: String,
    pub credits: u64,
    pub project_type: ProjectType,
}

// ─────────────────────────────────────────────────────────
// JSON-RPC response shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct SubmitResult {
    hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ReceiptStatus {
    Success,
    Failed,
}

#[derive(Debug, Deserialize)]
struct Receipt {
    status: ReceiptStatus,
}

// ─────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct LedgerClient {
    client: Client,
    rpc_url: String,
    contract_address: String,
    confirm_poll: Duration,
    confirm_attempts: u32,
}

impl LedgerClient {
    /// Build a client from configuration; `None` when no gateway is configured.
    pub fn from_config(config: &Config) -> Result<Option<Self>> {
        config
            .ledger_rpc_url
            .as_deref()
            .map(|url| {
                Self::new(
                    url,
                    &config.ledger_contract_address,
                    Duration::from_secs(config.ledger_timeout_secs),
                    Duration::from_millis(config.ledger_confirm_poll_ms),
                    config.ledger_confirm_attempts,
                )
            })
            .transpose()
    }

    pub fn new(
        rpc_url: &str,
        contract_address: &str,
        timeout: Duration,
        confirm_poll: Duration,
        confirm_attempts: u32,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            rpc_url: rpc_url.to_string(),
            contract_address: contract_address.to_string(),
            confirm_poll,
            confirm_attempts: confirm_attempts.max(1),
        })
    }

    /// Submit `registerProject`. Returns the transaction hash as soon as the
    /// gateway accepts it; see [`LedgerClient::await_receipt`].
    pub async fn submit_project(&self, request: &RegisterProject) -> Result<String> {
        let params = build_params(&self.contract_address, request);
        let submitted: SubmitResult = self
            .call("registerProject", params)
            .await?
            .ok_or_else(|| RegistryError::Ledger("No transaction hash in response".to_string()))?;

        info!(
            "registerProject submitted for {} ({} credits): {}",
            request.owner, request.credits, submitted.hash
        );
        Ok(submitted.hash)
    }

    /// Poll the receipt of `hash` until it settles.
    ///
    /// An error means the outcome is still unknown (no receipt within the
    /// poll budget, or a poll failed); the transaction may yet confirm.
    pub async fn await_receipt(&self, hash: &str) -> Result<TxOutcome> {
        for attempt in 1..=self.confirm_attempts {
            let receipt: Option<Receipt> = self
                .call("getTransactionReceipt", json!({ "hash": hash }))
                .await?;

            match receipt.map(|r| r.status) {
                Some(ReceiptStatus::Success) => {
                    info!("Transaction {hash} confirmed");
                    return Ok(TxOutcome::Confirmed);
                }
                Some(ReceiptStatus::Failed) => {
                    warn!("Transaction {hash} reverted");
                    return Ok(TxOutcome::Reverted);
                }
                None => {
                    debug!("Transaction {hash} pending (poll {attempt}/{})", self.confirm_attempts);
                    if attempt < self.confirm_attempts {
                        tokio::time::sleep(self.confirm_poll).await;
                    }
                }
            }
        }

        Err(RegistryError::Ledger(format!(
            "Transaction {hash} not confirmed after {} polls",
            self.confirm_attempts
        )))
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<Option<T>> {
        let response = self
            .client
            .post(&self.rpc_url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": method,
                "params": params,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::Ledger(format!(
                "{method} returned HTTP {status}"
            )));
        }

        let body: RpcResponse<T> = response.json().await?;
        if let Some(err) = body.error {
            return Err(RegistryError::Ledger(format!(
                "{method} failed ({}): {}",
                err.code, err.message
            )));
        }

        Ok(body.result)
    }
}

fn build_params(contract_address: &str, request: &RegisterProject) -> Value {
    json!({
        "contract": contract_address,
        "owner": request.owner,
        "dataHash": request.data_hash,
        "credits": request.credits,
        "projectType": request.project_type as u8,
    })
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
