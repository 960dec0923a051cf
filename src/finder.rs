//! Read-side queries for safes and flows

use std::sync::Arc;

use solana_sdk::pubkey::Pubkey;
use tracing::{debug, warn};

use crate::{
    accounts::{Flow, Safe, FLOW_SAFE_OFFSET},
    codec::SerializableJob,
    error::{SafeError, SafeResult},
    job::MultisigJob,
    pda,
    rpc::LedgerClient,
};

/// Fetches and decodes program accounts
pub struct SafeFinder {
    ledger: Arc<dyn LedgerClient>,
    program_id: Pubkey,
}

impl SafeFinder {
    pub fn new(ledger: Arc<dyn LedgerClient>, program_id: Pubkey) -> Self {
        Self { ledger, program_id }
    }

    async fn account_data(&self, address: &Pubkey) -> SafeResult<Vec<u8>> {
        self.ledger
            .get_account_data(address)
            .await?
            .ok_or_else(|| SafeError::AccountNotFound(address.to_string()))
    }

    /// Fetch and deserialize a Safe account
    pub async fn find_safe(&self, safe: &Pubkey) -> SafeResult<Safe> {
        Safe::try_from_account_data(&self.account_data(safe).await?)
    }

    /// Fetch a flow and decode it into its job
    pub async fn find_job(&self, flow: &Pubkey) -> SafeResult<MultisigJob> {
        Flow::try_job_from_account_data(&self.account_data(flow).await?, *flow)
    }

    /// All flows belonging to `safe`
    ///
    /// Accounts that match the filter but do not decode as flows are skipped.
    pub async fn find_jobs(&self, safe: &Pubkey) -> SafeResult<Vec<MultisigJob>> {
        let accounts = self
            .ledger
            .get_program_accounts_with_memcmp(
                &self.program_id,
                FLOW_SAFE_OFFSET,
                safe.to_bytes().to_vec(),
            )
            .await?;

        let mut jobs = Vec::with_capacity(accounts.len());
        for (address, data) in accounts {
            match Flow::try_job_from_account_data(&data, address) {
                Ok(job) => jobs.push(job),
                Err(err) => warn!(%address, %err, "Skipping undecodable flow account"),
            }
        }
        debug!(%safe, count = jobs.len(), "Found flows");
        Ok(jobs)
    }

    /// Fetch a flow's wire record, action metadata included
    pub async fn find_flow_record(&self, flow: &Pubkey) -> SafeResult<SerializableJob> {
        Flow::try_record_from_account_data(&self.account_data(flow).await?)
    }

    /// Safe a flow belongs to
    pub async fn find_safe_address_of_job(&self, flow: &Pubkey) -> SafeResult<Pubkey> {
        Ok(self.find_flow_record(flow).await?.safe)
    }

    /// Safe signer PDA and its bump
    pub fn find_safe_signer_address(&self, safe: &Pubkey) -> (Pubkey, u8) {
        pda::get_safe_signer_pda(safe, Some(&self.program_id))
    }
}
