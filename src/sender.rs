//! Transaction assembly, splitting and submission
//!
//! An instruction list is packed into a single transaction when it fits under the size
//! ceiling. Otherwise the list is bisected at `ceil(len / 2)` and each half is assembled
//! again with its own blockhash, recursively, left half first. A single instruction that
//! does not fit is fatal.
//!
//! Assembled transactions are signed by the caller-supplied signers they actually
//! require, then by the wallet, and sent strictly one after another. While a transaction
//! awaits confirmation a background task rebroadcasts the same signed bytes on a fixed
//! interval.

use std::{
    collections::HashSet,
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use once_cell::sync::Lazy;
use regex::Regex;
use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::Transaction,
};
use tokio::{
    task::JoinHandle,
    time::{sleep, Instant},
};
use tracing::{debug, info, warn};

use crate::{
    config::SenderConfig,
    error::{SafeError, SafeResult},
    rpc::{ConfirmationOutcome, LedgerClient},
    wallet::WalletSigner,
};

static PROGRAM_ERROR_LOG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Error: (.*)").expect("valid program error regex"));

type SplitFuture<'a> = Pin<Box<dyn Future<Output = SafeResult<Vec<DraftTransaction>>> + Send + 'a>>;

/// An unsigned transaction bound to a blockhash
#[derive(Debug, Clone)]
pub struct DraftTransaction {
    pub transaction: Transaction,
    /// Last block height at which the blockhash is valid
    pub last_valid_block_height: u64,
}

impl DraftTransaction {
    /// Addresses whose signature the transaction requires
    pub fn required_signers(&self) -> HashSet<Pubkey> {
        let message = &self.transaction.message;
        let count = usize::from(message.header.num_required_signatures);
        message.account_keys.iter().take(count).copied().collect()
    }
}

/// Serialized size of a transaction, signature slots included
pub fn transaction_size(transaction: &Transaction) -> SafeResult<usize> {
    Ok(bincode::serialized_size(transaction)? as usize)
}

/// Program error lines in execution logs
pub fn extract_program_errors(logs: &[String]) -> Vec<String> {
    logs.iter()
        .filter_map(|line| PROGRAM_ERROR_LOG.captures(line))
        .filter_map(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Builds, signs and submits transactions
pub struct TransactionSender {
    ledger: Arc<dyn LedgerClient>,
    wallet: Arc<dyn WalletSigner>,
    config: SenderConfig,
}

impl TransactionSender {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        wallet: Arc<dyn WalletSigner>,
        config: SenderConfig,
    ) -> Self {
        Self {
            ledger,
            wallet,
            config,
        }
    }

    pub fn config(&self) -> &SenderConfig {
        &self.config
    }

    /// Fee payer of every transaction
    pub fn payer(&self) -> Pubkey {
        self.wallet.pubkey()
    }

    /// Assemble `instructions` into one draft with a fresh blockhash
    pub async fn make_txn(&self, instructions: &[Instruction]) -> SafeResult<DraftTransaction> {
        let (blockhash, last_valid_block_height) = self.ledger.get_latest_blockhash().await?;
        let payer = self.wallet.pubkey();

        let mut transaction = Transaction::new_with_payer(instructions, Some(&payer));
        transaction.message.recent_blockhash = blockhash;

        Ok(DraftTransaction {
            transaction,
            last_valid_block_height,
        })
    }

    /// Assemble `instructions` into as many drafts as the size ceiling requires
    ///
    /// Draft order follows instruction order.
    pub fn split<'a>(&'a self, instructions: &'a [Instruction]) -> SplitFuture<'a> {
        Box::pin(async move {
            let draft = self.make_txn(instructions).await?;
            let size = transaction_size(&draft.transaction)?;
            let limit = self.config.max_transaction_size;

            if size <= limit {
                return Ok(vec![draft]);
            }
            if instructions.len() <= 1 {
                return Err(SafeError::TransactionTooLarge { size, limit });
            }

            let middle = instructions.len().div_ceil(2);
            debug!(
                size,
                limit,
                instructions = instructions.len(),
                middle,
                "Transaction too large, splitting"
            );

            let mut drafts = self.split(&instructions[..middle]).await?;
            drafts.extend(self.split(&instructions[middle..]).await?);
            Ok(drafts)
        })
    }

    /// Split, then sign every draft with the signers it requires and the wallet
    pub async fn prepare(
        &self,
        instructions: &[Instruction],
        signers: &[&Keypair],
    ) -> SafeResult<Vec<DraftTransaction>> {
        if instructions.is_empty() {
            return Err(SafeError::EmptyInstructions);
        }

        let mut drafts = self.split(instructions).await?;
        for draft in drafts.iter_mut() {
            partial_sign(draft, signers)?;
        }

        let mut transactions: Vec<Transaction> =
            drafts.iter().map(|draft| draft.transaction.clone()).collect();
        self.wallet.sign_transactions(&mut transactions).await?;
        for (draft, transaction) in drafts.iter_mut().zip(transactions) {
            draft.transaction = transaction;
        }

        Ok(drafts)
    }

    /// Send `instructions` and return the signature of the first transaction
    pub async fn send(
        &self,
        instructions: &[Instruction],
        signers: &[&Keypair],
    ) -> SafeResult<Signature> {
        self.send_all(instructions, signers)
            .await?
            .into_iter()
            .next()
            .ok_or(SafeError::EmptyInstructions)
    }

    /// Send `instructions` and return the signature of every transaction, in order
    ///
    /// Each transaction is confirmed before the next one is sent.
    pub async fn send_all(
        &self,
        instructions: &[Instruction],
        signers: &[&Keypair],
    ) -> SafeResult<Vec<Signature>> {
        let drafts = self.prepare(instructions, signers).await?;
        let total = drafts.len();

        let mut signatures = Vec::with_capacity(total);
        for (index, draft) in drafts.into_iter().enumerate() {
            let signature = self.send_one(draft).await?;
            info!(%signature, index, total, "Transaction confirmed");
            signatures.push(signature);
        }
        Ok(signatures)
    }

    /// Broadcast one signed transaction and wait for its confirmation
    pub async fn send_one(&self, draft: DraftTransaction) -> SafeResult<Signature> {
        let DraftTransaction {
            transaction,
            last_valid_block_height,
        } = draft;

        let signature = self.ledger.send_transaction(&transaction).await?;
        debug!(%signature, last_valid_block_height, "Transaction sent");

        let done = Arc::new(AtomicBool::new(false));
        let _resend = spawn_resend_loop(
            self.ledger.clone(),
            transaction,
            done.clone(),
            self.config.resend_interval(),
            self.config.resend_timeout(),
        );

        let outcome = self
            .ledger
            .confirm_transaction(&signature, last_valid_block_height)
            .await;
        done.store(true, Ordering::SeqCst);

        match outcome? {
            ConfirmationOutcome::Confirmed => Ok(signature),
            ConfirmationOutcome::Expired(reason) => {
                warn!(%signature, %reason, "Transaction expired");
                Err(SafeError::TransactionExpired { signature, reason })
            }
            ConfirmationOutcome::Failed(error) => {
                let logs = match self.ledger.get_transaction_logs(&signature).await {
                    Ok(logs) => extract_program_errors(&logs),
                    Err(err) => {
                        warn!(%signature, %err, "Failed to fetch transaction logs");
                        Vec::new()
                    }
                };
                warn!(%signature, %error, ?logs, "Transaction failed");
                Err(SafeError::TransactionFailed {
                    signature,
                    error,
                    logs,
                })
            }
        }
    }
}

/// Sign with the subset of `signers` the draft requires
fn partial_sign(draft: &mut DraftTransaction, signers: &[&Keypair]) -> SafeResult<()> {
    let required = draft.required_signers();
    let subset: Vec<&Keypair> = signers
        .iter()
        .copied()
        .filter(|signer| required.contains(&signer.pubkey()))
        .collect();

    if subset.is_empty() {
        return Ok(());
    }

    let blockhash = draft.transaction.message.recent_blockhash;
    draft
        .transaction
        .try_partial_sign(subset.as_slice(), blockhash)?;
    Ok(())
}

/// Rebroadcast `transaction` every `interval` until `done` is set or `timeout` elapses
///
/// Returns the number of rebroadcasts.
pub fn spawn_resend_loop(
    ledger: Arc<dyn LedgerClient>,
    transaction: Transaction,
    done: Arc<AtomicBool>,
    interval: Duration,
    timeout: Duration,
) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let started = Instant::now();
        let mut resent = 0;
        loop {
            sleep(interval).await;
            if done.load(Ordering::SeqCst) || started.elapsed() >= timeout {
                break;
            }
            match ledger.send_transaction(&transaction).await {
                Ok(_) => resent += 1,
                Err(err) => debug!(%err, "Rebroadcast failed"),
            }
        }
        resent
    })
}
