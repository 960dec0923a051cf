//! Ledger access
//!
//! [`LedgerClient`] is the narrow surface the sender and finder need from the network.
//! [`RpcLedger`] implements it on top of the nonblocking `solana-client` RPC client.

use async_trait::async_trait;
use solana_account_decoder::UiAccountEncoding;
use solana_client::{
    nonblocking::rpc_client::RpcClient,
    rpc_config::{
        RpcAccountInfoConfig, RpcProgramAccountsConfig, RpcSendTransactionConfig,
        RpcTransactionConfig,
    },
    rpc_filter::{Memcmp, RpcFilterType},
};
use solana_commitment_config::CommitmentConfig;
use solana_sdk::{hash::Hash, pubkey::Pubkey, signature::Signature, transaction::Transaction};
use solana_transaction_status::UiTransactionEncoding;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::{config::SenderConfig, error::SafeResult};

/// Expiry reason when the blockhash is no longer valid
pub const BLOCK_HEIGHT_EXCEEDED: &str = "block height exceeded";

/// Expiry reason when the confirmation wait ran out
pub const TIMEOUT_EXCEEDED: &str = "timeout exceeded";

/// How a confirmation wait ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    /// Landed without error
    Confirmed,
    /// Landed and failed, with the ledger's error description
    Failed(String),
    /// Never landed; see [`BLOCK_HEIGHT_EXCEEDED`] and [`TIMEOUT_EXCEEDED`]
    Expired(String),
}

/// What one confirmation poll observed
///
/// A `None` field means the value was not fetched or the fetch failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfirmationPoll {
    /// Landed status: `Ok(())` on success, the ledger's error otherwise
    pub status: Option<Result<(), String>>,
    pub block_height: Option<u64>,
}

impl ConfirmationPoll {
    /// Decide whether the wait is over
    ///
    /// A landed status wins over expiry. `None` means keep polling.
    pub fn outcome(
        &self,
        last_valid_block_height: u64,
        now: Instant,
        deadline: Instant,
    ) -> Option<ConfirmationOutcome> {
        if let Some(status) = &self.status {
            return Some(match status {
                Ok(()) => ConfirmationOutcome::Confirmed,
                Err(err) => ConfirmationOutcome::Failed(err.clone()),
            });
        }
        if matches!(self.block_height, Some(height) if height > last_valid_block_height) {
            return Some(ConfirmationOutcome::Expired(BLOCK_HEIGHT_EXCEEDED.to_string()));
        }
        if now >= deadline {
            return Some(ConfirmationOutcome::Expired(TIMEOUT_EXCEEDED.to_string()));
        }
        None
    }
}

/// Network operations used by the client
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Latest blockhash and the last block height at which it is valid
    async fn get_latest_blockhash(&self) -> SafeResult<(Hash, u64)>;

    /// Broadcast a signed transaction
    async fn send_transaction(&self, transaction: &Transaction) -> SafeResult<Signature>;

    /// Wait until `signature` lands or its blockhash expires
    async fn confirm_transaction(
        &self,
        signature: &Signature,
        last_valid_block_height: u64,
    ) -> SafeResult<ConfirmationOutcome>;

    /// Execution log lines of a landed transaction
    async fn get_transaction_logs(&self, signature: &Signature) -> SafeResult<Vec<String>>;

    /// Raw data of an account, `None` if it does not exist
    async fn get_account_data(&self, address: &Pubkey) -> SafeResult<Option<Vec<u8>>>;

    /// Accounts owned by `program_id` whose data holds `bytes` at `offset`
    async fn get_program_accounts_with_memcmp(
        &self,
        program_id: &Pubkey,
        offset: usize,
        bytes: Vec<u8>,
    ) -> SafeResult<Vec<(Pubkey, Vec<u8>)>>;
}

/// [`LedgerClient`] over JSON-RPC
pub struct RpcLedger {
    /// RPC client for communicating with Solana
    pub rpc: RpcClient,
    pub config: SenderConfig,
}

impl RpcLedger {
    pub fn new(rpc_url: String) -> Self {
        Self::from_rpc_client(RpcClient::new(rpc_url), SenderConfig::default())
    }

    pub fn from_rpc_client(rpc: RpcClient, config: SenderConfig) -> Self {
        Self { rpc, config }
    }

    fn commitment(&self) -> CommitmentConfig {
        self.config.commitment.to_commitment_config()
    }
}

#[async_trait]
impl LedgerClient for RpcLedger {
    async fn get_latest_blockhash(&self) -> SafeResult<(Hash, u64)> {
        Ok(self
            .rpc
            .get_latest_blockhash_with_commitment(self.commitment())
            .await?)
    }

    async fn send_transaction(&self, transaction: &Transaction) -> SafeResult<Signature> {
        let config = RpcSendTransactionConfig {
            skip_preflight: self.config.skip_preflight,
            preflight_commitment: Some(self.commitment().commitment),
            ..Default::default()
        };

        Ok(self
            .rpc
            .send_transaction_with_config(transaction, config)
            .await?)
    }

    async fn confirm_transaction(
        &self,
        signature: &Signature,
        last_valid_block_height: u64,
    ) -> SafeResult<ConfirmationOutcome> {
        let commitment = self.commitment();
        let deadline = Instant::now() + self.config.confirm_timeout();

        // Poll errors are transient: only the deadline or the block height ends the wait
        loop {
            let mut poll = ConfirmationPoll::default();
            match self
                .rpc
                .get_signature_status_with_commitment(signature, commitment)
                .await
            {
                Ok(status) => poll.status = status.map(|result| result.map_err(|e| e.to_string())),
                Err(err) => debug!(%signature, %err, "Signature status poll failed"),
            }

            if poll.status.is_none() {
                match self.rpc.get_block_height_with_commitment(commitment).await {
                    Ok(height) => poll.block_height = Some(height),
                    Err(err) => debug!(%signature, %err, "Block height poll failed"),
                }
            }

            if let Some(outcome) = poll.outcome(last_valid_block_height, Instant::now(), deadline) {
                debug!(%signature, ?outcome, block_height = ?poll.block_height, "Confirmation finished");
                return Ok(outcome);
            }

            sleep(self.config.confirm_poll_interval()).await;
        }
    }

    async fn get_transaction_logs(&self, signature: &Signature) -> SafeResult<Vec<String>> {
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Json),
            commitment: Some(self.commitment()),
            max_supported_transaction_version: Some(0),
        };

        let transaction = self
            .rpc
            .get_transaction_with_config(signature, config)
            .await?;

        let logs: Option<Vec<String>> = transaction
            .transaction
            .meta
            .and_then(|meta| meta.log_messages.into());
        Ok(logs.unwrap_or_default())
    }

    async fn get_account_data(&self, address: &Pubkey) -> SafeResult<Option<Vec<u8>>> {
        let response = self
            .rpc
            .get_account_with_commitment(address, self.commitment())
            .await?;
        Ok(response.value.map(|account| account.data))
    }

    async fn get_program_accounts_with_memcmp(
        &self,
        program_id: &Pubkey,
        offset: usize,
        bytes: Vec<u8>,
    ) -> SafeResult<Vec<(Pubkey, Vec<u8>)>> {
        let config = RpcProgramAccountsConfig {
            filters: Some(vec![RpcFilterType::Memcmp(Memcmp::new_base58_encoded(
                offset, &bytes,
            ))]),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                commitment: Some(self.commitment()),
                ..Default::default()
            },
            ..Default::default()
        };

        let accounts = self
            .rpc
            .get_program_accounts_with_config(program_id, config)
            .await?;
        debug!(%program_id, offset, count = accounts.len(), "Fetched program accounts");

        Ok(accounts
            .into_iter()
            .map(|(pubkey, account)| (pubkey, account.data))
            .collect())
    }
}
