//! Client and sender configuration
//!
//! Every field has a serde default, so a partial JSON document (or `{}`) is a valid
//! configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use solana_commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;

use crate::{
    error::{SafeError, SafeResult},
    types::DEFAULT_FLOW_SIZE,
    MAX_TRANSACTION_SIZE,
};

/// Commitment level used for blockhashes, preflight and confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn to_commitment_config(self) -> CommitmentConfig {
        match self {
            Commitment::Processed => CommitmentConfig::processed(),
            Commitment::Confirmed => CommitmentConfig::confirmed(),
            Commitment::Finalized => CommitmentConfig::finalized(),
        }
    }
}

/// Transaction submission settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SenderConfig {
    /// Delay between rebroadcasts of an unconfirmed transaction
    #[serde(default = "default_resend_interval_ms")]
    pub resend_interval_ms: u64,

    /// Overall rebroadcast window
    #[serde(default = "default_resend_timeout_ms")]
    pub resend_timeout_ms: u64,

    /// Delay between confirmation status polls
    #[serde(default = "default_confirm_poll_interval_ms")]
    pub confirm_poll_interval_ms: u64,

    /// Upper bound on the confirmation wait, on top of the block height bound
    #[serde(default = "default_confirm_timeout_ms")]
    pub confirm_timeout_ms: u64,

    /// Split threshold in bytes
    #[serde(default = "default_max_transaction_size")]
    pub max_transaction_size: usize,

    #[serde(default)]
    pub commitment: Commitment,

    /// Skip the preflight simulation on broadcast
    #[serde(default)]
    pub skip_preflight: bool,
}

fn default_resend_interval_ms() -> u64 {
    2_000
}

fn default_resend_timeout_ms() -> u64 {
    30_000
}

fn default_confirm_poll_interval_ms() -> u64 {
    500
}

fn default_confirm_timeout_ms() -> u64 {
    90_000
}

fn default_max_transaction_size() -> usize {
    MAX_TRANSACTION_SIZE
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            resend_interval_ms: default_resend_interval_ms(),
            resend_timeout_ms: default_resend_timeout_ms(),
            confirm_poll_interval_ms: default_confirm_poll_interval_ms(),
            confirm_timeout_ms: default_confirm_timeout_ms(),
            max_transaction_size: default_max_transaction_size(),
            commitment: Commitment::default(),
            skip_preflight: false,
        }
    }
}

impl SenderConfig {
    pub fn resend_interval(&self) -> Duration {
        Duration::from_millis(self.resend_interval_ms)
    }

    pub fn resend_timeout(&self) -> Duration {
        Duration::from_millis(self.resend_timeout_ms)
    }

    pub fn confirm_poll_interval(&self) -> Duration {
        Duration::from_millis(self.confirm_poll_interval_ms)
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_millis(self.confirm_timeout_ms)
    }
}

/// Top-level client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Program ID override (base58); the canonical program when absent
    #[serde(default)]
    pub program_id: Option<String>,

    /// Size of newly created flow accounts
    #[serde(default = "default_flow_account_size")]
    pub flow_account_size: u32,

    #[serde(default)]
    pub sender: SenderConfig,
}

fn default_flow_account_size() -> u32 {
    DEFAULT_FLOW_SIZE
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            program_id: None,
            flow_account_size: default_flow_account_size(),
            sender: SenderConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Parse a configuration from a JSON string
    pub fn from_json_str(contents: &str) -> SafeResult<Self> {
        serde_json::from_str(contents)
            .map_err(|e| SafeError::Config(format!("Failed to parse JSON: {}", e)))
    }

    /// Load configuration from a JSON file
    pub fn from_json_file(path: &str) -> SafeResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SafeError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        Self::from_json_str(&contents)
    }

    /// Resolved program ID
    pub fn program_id(&self) -> SafeResult<Pubkey> {
        match &self.program_id {
            Some(id) => id
                .parse()
                .map_err(|e| SafeError::Config(format!("Invalid program id {}: {}", id, e))),
            None => Ok(crate::program_id()),
        }
    }
}
