//! In-memory ledger for tests

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use solana_sdk::{hash::Hash, pubkey::Pubkey, signature::Signature, transaction::Transaction};

use crate::{
    error::{SafeError, SafeResult},
    rpc::{ConfirmationOutcome, LedgerClient},
};

pub const LAST_VALID_BLOCK_HEIGHT: u64 = 1_000;

#[derive(Default)]
pub struct MockLedger {
    calls: AtomicUsize,
    blockhash_calls: AtomicUsize,
    sent: Mutex<Vec<Transaction>>,
    outcomes: Mutex<VecDeque<ConfirmationOutcome>>,
    confirm_delay: Duration,
    logs: Vec<String>,
    accounts: Mutex<HashMap<Pubkey, Vec<u8>>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Confirmation waits this long before answering
    pub fn with_confirm_delay(mut self, delay: Duration) -> Self {
        self.confirm_delay = delay;
        self
    }

    /// Logs returned for any signature
    pub fn with_logs(mut self, logs: Vec<&str>) -> Self {
        self.logs = logs.into_iter().map(String::from).collect();
        self
    }

    /// Queue the outcome of the next confirmation; `Confirmed` once the queue is empty
    pub fn push_outcome(&self, outcome: ConfirmationOutcome) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    pub fn insert_account(&self, address: Pubkey, data: Vec<u8>) {
        self.accounts.lock().unwrap().insert(address, data);
    }

    /// Total number of ledger calls
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn blockhash_calls(&self) -> usize {
        self.blockhash_calls.load(Ordering::SeqCst)
    }

    /// Every broadcast, rebroadcasts included
    pub fn sent(&self) -> Vec<Transaction> {
        self.sent.lock().unwrap().clone()
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn get_latest_blockhash(&self) -> SafeResult<(Hash, u64)> {
        self.record_call();
        self.blockhash_calls.fetch_add(1, Ordering::SeqCst);
        Ok((Hash::new_unique(), LAST_VALID_BLOCK_HEIGHT))
    }

    async fn send_transaction(&self, transaction: &Transaction) -> SafeResult<Signature> {
        self.record_call();
        self.sent.lock().unwrap().push(transaction.clone());
        Ok(transaction.signatures[0])
    }

    async fn confirm_transaction(
        &self,
        _signature: &Signature,
        _last_valid_block_height: u64,
    ) -> SafeResult<ConfirmationOutcome> {
        self.record_call();
        tokio::time::sleep(self.confirm_delay).await;
        let outcome = self.outcomes.lock().unwrap().pop_front();
        Ok(outcome.unwrap_or(ConfirmationOutcome::Confirmed))
    }

    async fn get_transaction_logs(&self, _signature: &Signature) -> SafeResult<Vec<String>> {
        self.record_call();
        Ok(self.logs.clone())
    }

    async fn get_account_data(&self, address: &Pubkey) -> SafeResult<Option<Vec<u8>>> {
        self.record_call();
        Ok(self.accounts.lock().unwrap().get(address).cloned())
    }

    async fn get_program_accounts_with_memcmp(
        &self,
        _program_id: &Pubkey,
        offset: usize,
        bytes: Vec<u8>,
    ) -> SafeResult<Vec<(Pubkey, Vec<u8>)>> {
        self.record_call();
        if bytes.is_empty() {
            return Err(SafeError::Rpc("empty memcmp filter".to_string()));
        }
        let accounts = self.accounts.lock().unwrap();
        let mut matches: Vec<(Pubkey, Vec<u8>)> = accounts
            .iter()
            .filter(|(_, data)| data.get(offset..offset + bytes.len()) == Some(bytes.as_slice()))
            .map(|(address, data)| (*address, data.clone()))
            .collect();
        matches.sort_by_key(|(address, _)| *address);
        Ok(matches)
    }
}
