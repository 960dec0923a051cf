//! The multisig proposal job
//!
//! A [`MultisigJob`] is the client-side view of a flow account: what to run, when to
//! run it, who pays, and where the proposal stands in the approval process. Jobs are
//! usually put together with [`MultisigJobBuilder`](crate::job_builder::MultisigJobBuilder)
//! and converted to the program's wire format by [`crate::codec`].

use solana_sdk::{instruction::Instruction, pubkey::Pubkey};

use crate::{
    error::{SafeError, SafeResult},
    types::{ApprovalRecord, FeeSource, ProposalState, TriggerType, RETRY_WINDOW},
};

/// A proposal bundling instructions that need owner approval before execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultisigJob {
    /// Flow account address, assigned once the flow exists on-chain
    pub address: Option<Pubkey>,
    pub name: String,
    /// Instructions executed by the safe signer once approved
    pub instructions: Vec<Instruction>,

    pub trigger_type: TriggerType,
    pub recurring: bool,
    /// Unix timestamp of the next execution
    pub next_execution_time: i64,
    pub cron: String,
    /// Executions left, [`RECURRING_FOREVER`](crate::types::RECURRING_FOREVER) for unbounded
    pub remaining_runs: i16,
    /// Offset in seconds, positive west of UTC
    pub user_utc_offset: i32,
    pub schedule_end_date: i64,
    pub expire_on_complete: bool,
    pub retry_window: u32,

    pub pay_fee_from: FeeSource,
    /// Lamports moved into the flow at creation, self-funded jobs only
    pub initial_fund: u64,

    pub client_app_id: u32,
    pub dedicated_operator: Pubkey,
    pub requested_by: Pubkey,
    pub created_date: i64,
    pub last_updated_date: i64,
    pub last_scheduled_execution: i64,
    pub extra: String,

    /// Safe the proposal belongs to
    pub safe: Pubkey,
    /// Owner-set sequence number the approvals were collected under
    pub owner_set_seq: u32,
    pub approvals: Vec<ApprovalRecord>,
    pub proposal_stage: ProposalState,
}

impl Default for MultisigJob {
    fn default() -> Self {
        Self {
            address: None,
            name: String::new(),
            instructions: Vec::new(),
            trigger_type: TriggerType::None,
            recurring: false,
            next_execution_time: 0,
            cron: String::new(),
            remaining_runs: 0,
            user_utc_offset: 0,
            schedule_end_date: 0,
            expire_on_complete: false,
            retry_window: RETRY_WINDOW,
            pay_fee_from: FeeSource::FeeAccount,
            initial_fund: 0,
            client_app_id: 0,
            dedicated_operator: Pubkey::default(),
            requested_by: Pubkey::default(),
            created_date: 0,
            last_updated_date: 0,
            last_scheduled_execution: 0,
            extra: String::new(),
            safe: Pubkey::default(),
            owner_set_seq: 0,
            approvals: Vec::new(),
            proposal_stage: ProposalState::Pending,
        }
    }
}

impl MultisigJob {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the job can be submitted as a new flow
    pub fn validate_for_create(&self) -> SafeResult<()> {
        if self.address.is_some() {
            return Err(SafeError::JobAlreadyHasIdentity);
        }
        Ok(())
    }

    /// Check the job refers to an existing flow
    pub fn validate_for_update(&self) -> SafeResult<()> {
        if self.address.is_none() {
            return Err(SafeError::JobHasNoIdentity);
        }
        Ok(())
    }

    pub fn is_scheduled_once(&self) -> bool {
        !self.recurring && self.trigger_type == TriggerType::Time
    }

    pub fn is_scheduled_cron(&self) -> bool {
        self.recurring && self.trigger_type == TriggerType::Time
    }

    pub fn is_conditional(&self) -> bool {
        self.trigger_type == TriggerType::ProgramCondition
    }

    pub fn is_self_funded(&self) -> bool {
        self.pay_fee_from == FeeSource::SelfFunded
    }

    /// Number of approving votes recorded
    pub fn approval_count(&self) -> usize {
        self.approvals.iter().filter(|a| a.is_approved).count()
    }

    /// Number of rejecting votes recorded
    pub fn rejection_count(&self) -> usize {
        self.approvals.iter().filter(|a| !a.is_approved).count()
    }

    /// Check if an owner has voted, either way
    pub fn has_voted(&self, owner: &Pubkey) -> bool {
        self.approvals.iter().any(|a| &a.owner == owner)
    }
}
