//! Async client for the Snowflake Safe program
//!
//! [`SnowflakeSafe`] combines instruction building with the transaction sender and the
//! finder, one call per business operation. Inputs are validated before any network
//! call is made.
//!
//! # Features
//! This module is only available with the `async` feature enabled.

use std::sync::Arc;

use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
};
use tracing::info;

use crate::{
    accounts::Safe,
    action::ActionRecord,
    codec::to_wire,
    config::{ClientConfig, SenderConfig},
    error::{SafeError, SafeResult},
    finder::SafeFinder,
    instructions,
    job::MultisigJob,
    job_builder::MultisigJobBuilder,
    rpc::{LedgerClient, RpcLedger},
    sender::TransactionSender,
    types::{ProposalState, RETRY_WINDOW},
    wallet::{KeypairWallet, WalletSigner},
};

/// High-level async client for the Snowflake Safe program
pub struct SnowflakeSafe {
    pub sender: TransactionSender,
    pub finder: SafeFinder,
    /// Program ID to use (defaults to canonical Snowflake Safe program ID)
    pub program_id: Pubkey,
    /// Size of flow accounts created without an explicit size
    pub flow_account_size: u32,
    wallet: Pubkey,
}

impl SnowflakeSafe {
    /// Create a new client with the default program ID
    pub fn new(rpc_url: String, wallet: Keypair) -> Self {
        Self::from_rpc_client(RpcClient::new(rpc_url), wallet)
    }

    /// Create a new client with a custom program ID
    pub fn new_with_program_id(rpc_url: String, wallet: Keypair, program_id: Pubkey) -> Self {
        let ledger = Arc::new(RpcLedger::from_rpc_client(
            RpcClient::new(rpc_url),
            SenderConfig::default(),
        ));
        Self::assemble(
            ledger,
            Arc::new(KeypairWallet::new(wallet)),
            program_id,
            ClientConfig::default(),
        )
    }

    /// Create a client with an existing RpcClient
    pub fn from_rpc_client(rpc: RpcClient, wallet: Keypair) -> Self {
        let ledger = Arc::new(RpcLedger::from_rpc_client(rpc, SenderConfig::default()));
        Self::assemble(
            ledger,
            Arc::new(KeypairWallet::new(wallet)),
            crate::program_id(),
            ClientConfig::default(),
        )
    }

    /// Create a client from a loaded configuration
    pub fn with_config(rpc_url: String, wallet: Keypair, config: ClientConfig) -> SafeResult<Self> {
        let rpc = RpcClient::new_with_commitment(
            rpc_url,
            config.sender.commitment.to_commitment_config(),
        );
        let ledger = Arc::new(RpcLedger::from_rpc_client(rpc, config.sender.clone()));
        Self::from_parts(ledger, Arc::new(KeypairWallet::new(wallet)), config)
    }

    /// Create a client over any ledger and wallet
    pub fn from_parts(
        ledger: Arc<dyn LedgerClient>,
        wallet: Arc<dyn WalletSigner>,
        config: ClientConfig,
    ) -> SafeResult<Self> {
        let program_id = config.program_id()?;
        Ok(Self::assemble(ledger, wallet, program_id, config))
    }

    fn assemble(
        ledger: Arc<dyn LedgerClient>,
        wallet: Arc<dyn WalletSigner>,
        program_id: Pubkey,
        config: ClientConfig,
    ) -> Self {
        Self {
            wallet: wallet.pubkey(),
            sender: TransactionSender::new(ledger.clone(), wallet, config.sender),
            finder: SafeFinder::new(ledger, program_id),
            program_id,
            flow_account_size: config.flow_account_size,
        }
    }

    /// Fee payer and acting owner
    pub fn wallet(&self) -> Pubkey {
        self.wallet
    }

    /// Get the safe signer PDA
    pub fn find_safe_signer_address(&self, safe: &Pubkey) -> (Pubkey, u8) {
        self.finder.find_safe_signer_address(safe)
    }

    /// Create a new safe
    ///
    /// # Arguments
    /// * `safe_keypair` - Freshly generated keypair for the safe account
    /// * `owners` - Initial owners
    /// * `approvals_required` - Approval threshold, between 1 and the number of owners
    pub async fn create_safe(
        &self,
        safe_keypair: &Keypair,
        owners: Vec<Pubkey>,
        approvals_required: u8,
    ) -> SafeResult<Signature> {
        validate_approvals_required(&owners, approvals_required)?;

        let safe = safe_keypair.pubkey();
        let (_, safe_signer_nonce) = self.find_safe_signer_address(&safe);
        let ix = instructions::create_safe(
            self.wallet,
            safe,
            safe_signer_nonce,
            owners,
            approvals_required,
            Some(self.program_id),
        )?;

        let signature = self.sender.send(&[ix], &[safe_keypair]).await?;
        info!(%safe, %signature, "Safe created");
        Ok(signature)
    }

    /// Replace the owners and threshold of a safe
    pub async fn update_safe(
        &self,
        safe: &Pubkey,
        owners: Vec<Pubkey>,
        approvals_required: u8,
    ) -> SafeResult<Signature> {
        validate_approvals_required(&owners, approvals_required)?;

        let ix = instructions::update_safe(
            self.wallet,
            *safe,
            owners,
            approvals_required,
            Some(self.program_id),
        )?;
        self.sender.send(&[ix], &[]).await
    }

    /// Create a flow and approve it as its creator
    ///
    /// # Arguments
    /// * `safe` - Safe the flow belongs to
    /// * `account_size` - Flow account size, the configured default when `None`
    /// * `job` - Job without an address
    /// * `flow_keypair` - Freshly generated keypair for the flow account
    /// * `setup_instructions` - Sent ahead of the flow creation
    pub async fn create_flow(
        &self,
        safe: &Pubkey,
        account_size: Option<u32>,
        job: &MultisigJob,
        flow_keypair: &Keypair,
        setup_instructions: Vec<Instruction>,
    ) -> SafeResult<Signature> {
        self.submit_flow(safe, account_size, job, flow_keypair, setup_instructions, true)
            .await
    }

    /// Create a proposal running `instructions`
    ///
    /// Returns the new flow address and the first transaction signature.
    pub async fn create_proposal(
        &self,
        safe: &Pubkey,
        name: &str,
        instructions: Vec<Instruction>,
        setup_instructions: Vec<Instruction>,
        account_size: Option<u32>,
        approve: bool,
    ) -> SafeResult<(Pubkey, Signature)> {
        let job = MultisigJobBuilder::new()
            .job_name(name)
            .job_instructions(instructions)
            .build();
        self.create_proposal_from_job(safe, &job, setup_instructions, account_size, approve)
            .await
    }

    /// Create a proposal from a prepared job (scheduled, recurring or conditional)
    pub async fn create_proposal_from_job(
        &self,
        safe: &Pubkey,
        job: &MultisigJob,
        setup_instructions: Vec<Instruction>,
        account_size: Option<u32>,
        approve: bool,
    ) -> SafeResult<(Pubkey, Signature)> {
        let flow_keypair = Keypair::new();
        let signature = self
            .submit_flow(safe, account_size, job, &flow_keypair, setup_instructions, approve)
            .await?;
        Ok((flow_keypair.pubkey(), signature))
    }

    async fn submit_flow(
        &self,
        safe: &Pubkey,
        account_size: Option<u32>,
        job: &MultisigJob,
        flow_keypair: &Keypair,
        setup_instructions: Vec<Instruction>,
        approve: bool,
    ) -> SafeResult<Signature> {
        job.validate_for_create()?;

        let flow = flow_keypair.pubkey();
        let mut record = to_wire(job);
        record.safe = *safe;
        record.requested_by = self.wallet;
        // Stage and votes are owned by the program once the flow exists
        record.approvals = Vec::new();
        record.proposal_state = ProposalState::Pending as u8;
        record.retry_window = RETRY_WINDOW;

        let mut ixs = setup_instructions;
        ixs.push(instructions::create_flow(
            self.wallet,
            account_size.unwrap_or(self.flow_account_size),
            record,
            *safe,
            flow,
            Some(self.program_id),
        )?);
        if approve {
            ixs.push(instructions::approve_proposal(
                *safe,
                flow,
                self.wallet,
                Some(self.program_id),
            )?);
        }

        let signature = self.sender.send(&ixs, &[flow_keypair]).await?;
        info!(%safe, %flow, %signature, actions = job.instructions.len(), "Flow created");
        Ok(signature)
    }

    /// Instruction appending `instruction` as an action of a pending flow
    pub fn create_add_proposal_action_instruction(
        &self,
        flow: &Pubkey,
        instruction: &Instruction,
    ) -> SafeResult<Instruction> {
        instructions::add_action(
            *flow,
            self.wallet,
            ActionRecord::from_instruction(instruction),
            Some(self.program_id),
        )
    }

    /// Append `instructions` as actions of an existing flow
    ///
    /// Returns one signature per transaction sent.
    pub async fn add_proposal_actions(
        &self,
        job: &MultisigJob,
        instructions: &[Instruction],
    ) -> SafeResult<Vec<Signature>> {
        job.validate_for_update()?;
        let flow = job.address.ok_or(SafeError::JobHasNoIdentity)?;

        let ixs = instructions
            .iter()
            .map(|ix| self.create_add_proposal_action_instruction(&flow, ix))
            .collect::<SafeResult<Vec<_>>>()?;
        self.sender.send_all(&ixs, &[]).await
    }

    /// Delete a flow (creator only)
    pub async fn delete_flow(&self, flow: &Pubkey) -> SafeResult<Signature> {
        let ix = instructions::delete_flow(self.wallet, *flow, Some(self.program_id))?;
        self.sender.send(&[ix], &[]).await
    }

    /// Approve a proposal
    pub async fn approve_proposal(&self, safe: &Pubkey, flow: &Pubkey) -> SafeResult<Signature> {
        let ix = instructions::approve_proposal(*safe, *flow, self.wallet, Some(self.program_id))?;
        self.sender.send(&[ix], &[]).await
    }

    /// Reject a proposal
    pub async fn reject_proposal(&self, safe: &Pubkey, flow: &Pubkey) -> SafeResult<Signature> {
        let ix = instructions::reject_proposal(*safe, *flow, self.wallet, Some(self.program_id))?;
        self.sender.send(&[ix], &[]).await
    }

    /// Abort a recurring flow
    pub async fn abort_flow(&self, flow: &Pubkey, safe: &Pubkey) -> SafeResult<Signature> {
        let ix = instructions::abort_flow(*flow, *safe, self.wallet, Some(self.program_id))?;
        self.sender.send(&[ix], &[]).await
    }

    /// Execute an approved flow with the given actions
    pub async fn execute_multisig_flow(
        &self,
        flow: &Pubkey,
        actions: &[ActionRecord],
        safe: &Pubkey,
    ) -> SafeResult<Signature> {
        let (safe_signer, _) = self.find_safe_signer_address(safe);
        let ix = instructions::execute_multisig_flow(
            *flow,
            *safe,
            safe_signer,
            self.wallet,
            actions,
            Some(self.program_id),
        )?;

        let signature = self
            .sender
            .send(&[ix, instructions::execution_memo()], &[])
            .await?;
        info!(%flow, %signature, "Flow executed");
        Ok(signature)
    }

    /// Fetch a flow's actions and execute it
    pub async fn execute_proposal(&self, flow: &Pubkey) -> SafeResult<Signature> {
        let record = self.finder.find_flow_record(flow).await?;
        self.execute_multisig_flow(flow, &record.actions, &record.safe)
            .await
    }

    /// Instruction adding an owner, to be wrapped in a proposal
    pub fn create_add_owner_instruction(
        &self,
        safe: &Pubkey,
        owner: &Pubkey,
    ) -> SafeResult<Instruction> {
        let (safe_signer, _) = self.find_safe_signer_address(safe);
        instructions::add_owner(safe_signer, *safe, *owner, Some(self.program_id))
    }

    /// Instruction removing an owner, to be wrapped in a proposal
    pub fn create_remove_owner_instruction(
        &self,
        safe: &Pubkey,
        owner: &Pubkey,
    ) -> SafeResult<Instruction> {
        let (safe_signer, _) = self.find_safe_signer_address(safe);
        instructions::remove_owner(safe_signer, *safe, *owner, Some(self.program_id))
    }

    /// Instruction changing the threshold, to be wrapped in a proposal
    pub fn create_change_threshold_instruction(
        &self,
        safe: &Pubkey,
        threshold: u8,
    ) -> SafeResult<Instruction> {
        let (safe_signer, _) = self.find_safe_signer_address(safe);
        instructions::change_threshold(safe_signer, *safe, threshold, Some(self.program_id))
    }

    pub async fn fetch_safe(&self, safe: &Pubkey) -> SafeResult<Safe> {
        self.finder.find_safe(safe).await
    }

    pub async fn fetch_proposal(&self, flow: &Pubkey) -> SafeResult<MultisigJob> {
        self.finder.find_job(flow).await
    }

    pub async fn fetch_all_proposals(&self, safe: &Pubkey) -> SafeResult<Vec<MultisigJob>> {
        self.finder.find_jobs(safe).await
    }

    pub async fn find_safe_address_of_proposal(&self, flow: &Pubkey) -> SafeResult<Pubkey> {
        self.finder.find_safe_address_of_job(flow).await
    }
}

fn validate_approvals_required(owners: &[Pubkey], approvals_required: u8) -> SafeResult<()> {
    if approvals_required == 0 || usize::from(approvals_required) > owners.len() {
        return Err(SafeError::InvalidApprovalsRequired {
            approvals_required,
            owners: owners.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        accounts::Flow,
        codec::SerializableJob,
        instructions::EXECUTION_MEMO,
        mock::MockLedger,
    };
    use solana_sdk::{instruction::AccountMeta, transaction::Transaction};

    fn client_with(ledger: Arc<MockLedger>) -> SnowflakeSafe {
        let wallet = Arc::new(KeypairWallet::new(Keypair::new()));
        SnowflakeSafe::from_parts(ledger, wallet, ClientConfig::default()).unwrap()
    }

    fn transfer_like(signer: Pubkey) -> Instruction {
        Instruction {
            program_id: Pubkey::new_unique(),
            accounts: vec![
                AccountMeta::new(signer, true),
                AccountMeta::new(Pubkey::new_unique(), false),
            ],
            data: vec![2, 0, 0, 0, 64, 66, 15, 0, 0, 0, 0, 0],
        }
    }

    fn program_ids(tx: &Transaction) -> Vec<Pubkey> {
        tx.message
            .instructions
            .iter()
            .map(|ix| tx.message.account_keys[usize::from(ix.program_id_index)])
            .collect()
    }

    #[test]
    fn test_client_creation() {
        let client = SnowflakeSafe::new(
            "https://api.mainnet-beta.solana.com".to_string(),
            Keypair::new(),
        );
        assert_eq!(client.program_id, crate::program_id());
        assert_eq!(client.flow_account_size, 1800);
    }

    #[test]
    fn test_client_with_custom_program_id() {
        let custom_program_id = Pubkey::new_unique();
        let client = SnowflakeSafe::new_with_program_id(
            "https://api.mainnet-beta.solana.com".to_string(),
            Keypair::new(),
            custom_program_id,
        );
        assert_eq!(client.program_id, custom_program_id);
        let safe = Pubkey::new_unique();
        assert_eq!(
            client.find_safe_signer_address(&safe),
            crate::pda::get_safe_signer_pda(&safe, Some(&custom_program_id))
        );
    }

    #[tokio::test]
    async fn test_create_with_identity_makes_no_ledger_calls() {
        let ledger = Arc::new(MockLedger::new());
        let client = client_with(ledger.clone());
        let mut job = MultisigJobBuilder::new().job_name("again").build();
        job.address = Some(Pubkey::new_unique());

        let result = client
            .create_proposal_from_job(&Pubkey::new_unique(), &job, vec![], None, true)
            .await;

        assert!(matches!(result, Err(SafeError::JobAlreadyHasIdentity)));
        assert_eq!(ledger.call_count(), 0);
    }

    #[tokio::test]
    async fn test_update_without_identity_makes_no_ledger_calls() {
        let ledger = Arc::new(MockLedger::new());
        let client = client_with(ledger.clone());
        let job = MultisigJobBuilder::new().build();

        let result = client
            .add_proposal_actions(&job, &[transfer_like(Pubkey::new_unique())])
            .await;

        assert!(matches!(result, Err(SafeError::JobHasNoIdentity)));
        assert_eq!(ledger.call_count(), 0);
    }

    #[tokio::test]
    async fn test_create_safe_validates_threshold() {
        let ledger = Arc::new(MockLedger::new());
        let client = client_with(ledger.clone());
        let owners = vec![Pubkey::new_unique(), Pubkey::new_unique()];

        for approvals_required in [0, 3] {
            let result = client
                .create_safe(&Keypair::new(), owners.clone(), approvals_required)
                .await;
            assert!(matches!(
                result,
                Err(SafeError::InvalidApprovalsRequired { owners: 2, .. })
            ));
        }
        assert_eq!(ledger.call_count(), 0);

        let safe_keypair = Keypair::new();
        let signature = client.create_safe(&safe_keypair, owners, 2).await.unwrap();

        let sent = ledger.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].signatures[0], signature);
        assert!(sent[0].verify().is_ok());
        assert!(sent[0].message.account_keys.contains(&safe_keypair.pubkey()));
    }

    #[tokio::test]
    async fn test_create_proposal_orders_instructions() {
        let ledger = Arc::new(MockLedger::new());
        let client = client_with(ledger.clone());
        let safe = Pubkey::new_unique();
        let (safe_signer, _) = client.find_safe_signer_address(&safe);
        let setup = Instruction {
            program_id: crate::associated_token_program_id(),
            accounts: vec![AccountMeta::new(client.wallet(), true)],
            data: vec![],
        };

        let (flow, _) = client
            .create_proposal(
                &safe,
                "pay rent",
                vec![transfer_like(safe_signer)],
                vec![setup],
                None,
                true,
            )
            .await
            .unwrap();

        let sent = ledger.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].verify().is_ok());
        assert_eq!(
            program_ids(&sent[0]),
            vec![
                crate::associated_token_program_id(),
                crate::program_id(),
                crate::program_id()
            ]
        );
        assert!(sent[0].message.account_keys.contains(&flow));
    }

    #[tokio::test]
    async fn test_create_proposal_without_approval() {
        let ledger = Arc::new(MockLedger::new());
        let client = client_with(ledger.clone());

        client
            .create_proposal(&Pubkey::new_unique(), "draft", vec![], vec![], Some(2400), false)
            .await
            .unwrap();

        let sent = ledger.sent();
        assert_eq!(program_ids(&sent[0]), vec![crate::program_id()]);
        let data = &sent[0].message.instructions[0].data;
        assert_eq!(&data[8..12], &2400u32.to_le_bytes());
    }

    #[tokio::test]
    async fn test_recreated_job_starts_pending() {
        let ledger = Arc::new(MockLedger::new());
        let client = client_with(ledger.clone());
        let safe = Pubkey::new_unique();
        let mut job = MultisigJobBuilder::new().job_name("rerun").build();
        job.proposal_stage = ProposalState::Approved;
        job.approvals = vec![crate::types::ApprovalRecord {
            owner: Pubkey::new_unique(),
            is_approved: true,
        }];
        job.retry_window = 77;

        client
            .create_proposal_from_job(&safe, &job, vec![], None, false)
            .await
            .unwrap();

        let data = &ledger.sent()[0].message.instructions[0].data;
        let record: SerializableJob = borsh::from_slice(&data[12..]).unwrap();
        assert_eq!(record.proposal_state, ProposalState::Pending as u8);
        assert!(record.approvals.is_empty());
        assert_eq!(record.retry_window, RETRY_WINDOW);
        assert_eq!(record.safe, safe);
        assert_eq!(record.requested_by, client.wallet());
        assert_eq!(record.name, "rerun");
    }

    #[tokio::test]
    async fn test_add_proposal_actions() {
        let ledger = Arc::new(MockLedger::new());
        let client = client_with(ledger.clone());
        let mut job = MultisigJobBuilder::new().build();
        job.address = Some(Pubkey::new_unique());

        let signatures = client
            .add_proposal_actions(&job, &[transfer_like(Pubkey::new_unique())])
            .await
            .unwrap();
        assert_eq!(signatures.len(), 1);
        assert_eq!(program_ids(&ledger.sent()[0]), vec![crate::program_id()]);
    }

    #[tokio::test]
    async fn test_execute_proposal_fetches_actions() {
        let ledger = Arc::new(MockLedger::new());
        let client = client_with(ledger.clone());
        let safe = Pubkey::new_unique();
        let (safe_signer, _) = client.find_safe_signer_address(&safe);
        let action_ix = transfer_like(safe_signer);

        let mut job = MultisigJobBuilder::new()
            .job_name("execute me")
            .job_instructions(vec![action_ix.clone()])
            .build();
        job.safe = safe;
        let record: SerializableJob = to_wire(&job);
        let flow = Pubkey::new_unique();
        ledger.insert_account(flow, Flow::to_account_data(&record, 1800).unwrap());

        client.execute_proposal(&flow).await.unwrap();

        let sent = ledger.sent();
        let tx = sent.last().unwrap();
        assert_eq!(
            program_ids(tx),
            vec![crate::program_id(), crate::memo_program_id()]
        );
        assert_eq!(tx.message.instructions[1].data, EXECUTION_MEMO.to_vec());
        assert!(tx.message.account_keys.contains(&action_ix.program_id));
        // The safe signer is referenced but never required to sign
        let signer_count = usize::from(tx.message.header.num_required_signatures);
        assert!(!tx.message.account_keys[..signer_count].contains(&safe_signer));
        assert!(tx.message.account_keys.contains(&safe_signer));
    }

    #[tokio::test]
    async fn test_fetch_all_proposals() {
        let ledger = Arc::new(MockLedger::new());
        let client = client_with(ledger.clone());
        let safe = Pubkey::new_unique();
        let mut job = MultisigJobBuilder::new().job_name("listed").build();
        job.safe = safe;
        let flow = Pubkey::new_unique();
        ledger.insert_account(flow, Flow::to_account_data(&to_wire(&job), 1800).unwrap());

        let proposals = client.fetch_all_proposals(&safe).await.unwrap();
        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].address, Some(flow));
        assert_eq!(client.find_safe_address_of_proposal(&flow).await.unwrap(), safe);
        assert_eq!(client.fetch_proposal(&flow).await.unwrap().name, "listed");
    }

    #[test]
    fn test_owner_management_instructions() {
        let client = client_with(Arc::new(MockLedger::new()));
        let safe = Pubkey::new_unique();
        let (safe_signer, _) = client.find_safe_signer_address(&safe);

        let ix = client
            .create_add_owner_instruction(&safe, &Pubkey::new_unique())
            .unwrap();
        assert_eq!(ix.accounts[1], AccountMeta::new_readonly(safe_signer, false));

        let ix = client.create_change_threshold_instruction(&safe, 2).unwrap();
        assert_eq!(ix.data[8], 2);
        assert!(client
            .create_remove_owner_instruction(&safe, &Pubkey::new_unique())
            .is_ok());
    }
}
