//! Instruction builders for the Snowflake Safe program
//!
//! Every program operation is a variant of [`SafeInstruction`] carrying its own argument
//! struct. The builder functions pair an operation with the account list the program
//! expects for it and return a ready-to-send [`Instruction`]. Builders do not validate
//! their inputs; [`crate::client::SnowflakeSafe`] does that before calling them.

use borsh::BorshSerialize;
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};
use solana_sdk_ids::system_program;

use crate::{
    action::ActionRecord,
    codec::SerializableJob,
    error::SafeResult,
};

/// Memo attached to manually executed flows
pub const EXECUTION_MEMO: &[u8] = b"snf_exec_manual";

/// Helper function to compute Anchor instruction discriminator
/// Discriminator is the first 8 bytes of SHA256("global:instruction_name")
fn instruction_discriminator(name: &str) -> [u8; 8] {
    use solana_sdk::hash::hash;
    let preimage = format!("global:{}", name);
    let hash_result = hash(preimage.as_bytes());
    let mut discriminator = [0u8; 8];
    discriminator.copy_from_slice(&hash_result.to_bytes()[..8]);
    discriminator
}

/// Arguments for creating a safe
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize)]
pub struct CreateSafeArgs {
    pub approvals_required: u8,
    pub creator: Pubkey,
    /// Set by the program
    pub created_at: i64,
    /// Bump of the safe signer PDA
    pub signer_nonce: u8,
    pub extra: String,
    pub owners: Vec<Pubkey>,
}

/// Arguments for replacing a safe's owners and threshold
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize)]
pub struct UpdateSafeArgs {
    pub owners: Vec<Pubkey>,
    pub approvals_required: u8,
}

/// Arguments for adding or removing an owner
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize)]
pub struct OwnerArgs {
    pub owner: Pubkey,
}

/// Arguments for changing the approval threshold
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize)]
pub struct ChangeThresholdArgs {
    pub threshold: u8,
}

/// Arguments for creating a flow
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize)]
pub struct CreateFlowArgs {
    /// Size of the flow account to allocate
    pub account_size: u32,
    pub client_flow: SerializableJob,
}

/// Arguments for voting on a proposal
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize)]
pub struct ApproveProposalArgs {
    /// `true` approves, `false` rejects
    pub is_approved: bool,
}

/// Arguments for appending an action to an existing flow
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize)]
pub struct AddActionArgs {
    pub action: ActionRecord,
}

/// Operations accepted by the Snowflake Safe program
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafeInstruction {
    CreateSafe(CreateSafeArgs),
    UpdateSafe(UpdateSafeArgs),
    AddOwner(OwnerArgs),
    RemoveOwner(OwnerArgs),
    ChangeThreshold(ChangeThresholdArgs),
    CreateFlow(CreateFlowArgs),
    DeleteFlow,
    AbortFlow,
    ApproveProposal(ApproveProposalArgs),
    AddAction(AddActionArgs),
    ExecuteMultisigFlow,
}

impl SafeInstruction {
    /// Program method name, as used for the discriminator
    pub fn name(&self) -> &'static str {
        match self {
            SafeInstruction::CreateSafe(_) => "create_safe",
            SafeInstruction::UpdateSafe(_) => "update_safe",
            SafeInstruction::AddOwner(_) => "add_owner",
            SafeInstruction::RemoveOwner(_) => "remove_owner",
            SafeInstruction::ChangeThreshold(_) => "change_threshold",
            SafeInstruction::CreateFlow(_) => "create_flow",
            SafeInstruction::DeleteFlow => "delete_flow",
            SafeInstruction::AbortFlow => "abort_flow",
            SafeInstruction::ApproveProposal(_) => "approve_proposal",
            SafeInstruction::AddAction(_) => "add_action",
            SafeInstruction::ExecuteMultisigFlow => "execute_multisig_flow",
        }
    }

    /// Discriminator followed by the borsh encoded arguments
    pub fn data(&self) -> SafeResult<Vec<u8>> {
        let mut data = instruction_discriminator(self.name()).to_vec();
        match self {
            SafeInstruction::CreateSafe(args) => args.serialize(&mut data)?,
            SafeInstruction::UpdateSafe(args) => args.serialize(&mut data)?,
            SafeInstruction::AddOwner(args) | SafeInstruction::RemoveOwner(args) => {
                args.serialize(&mut data)?
            }
            SafeInstruction::ChangeThreshold(args) => args.serialize(&mut data)?,
            SafeInstruction::CreateFlow(args) => args.serialize(&mut data)?,
            SafeInstruction::ApproveProposal(args) => args.serialize(&mut data)?,
            SafeInstruction::AddAction(args) => args.serialize(&mut data)?,
            SafeInstruction::DeleteFlow
            | SafeInstruction::AbortFlow
            | SafeInstruction::ExecuteMultisigFlow => {}
        }
        Ok(data)
    }

    /// Build the instruction against `program_id` with the given accounts
    pub fn into_instruction(
        self,
        accounts: Vec<AccountMeta>,
        program_id: Option<Pubkey>,
    ) -> SafeResult<Instruction> {
        Ok(Instruction {
            program_id: program_id.unwrap_or_else(crate::program_id),
            accounts,
            data: self.data()?,
        })
    }
}

/// Create a new safe
///
/// # Arguments
/// * `payer` - Creator and fee payer
/// * `safe` - New safe account (must be signer)
/// * `safe_signer_nonce` - Bump of the safe signer PDA
/// * `owners` - Initial owners
/// * `approvals_required` - Approval threshold
/// * `program_id` - Optional custom program ID
pub fn create_safe(
    payer: Pubkey,
    safe: Pubkey,
    safe_signer_nonce: u8,
    owners: Vec<Pubkey>,
    approvals_required: u8,
    program_id: Option<Pubkey>,
) -> SafeResult<Instruction> {
    let accounts = vec![
        AccountMeta::new(payer, true),
        AccountMeta::new(safe, true),
        AccountMeta::new_readonly(system_program::ID, false),
    ];

    SafeInstruction::CreateSafe(CreateSafeArgs {
        approvals_required,
        creator: payer,
        created_at: 0,
        signer_nonce: safe_signer_nonce,
        extra: String::new(),
        owners,
    })
    .into_instruction(accounts, program_id)
}

/// Replace the owners and threshold of a safe
pub fn update_safe(
    caller: Pubkey,
    safe: Pubkey,
    owners: Vec<Pubkey>,
    approvals_required: u8,
    program_id: Option<Pubkey>,
) -> SafeResult<Instruction> {
    let accounts = vec![AccountMeta::new(safe, false), AccountMeta::new(caller, true)];

    SafeInstruction::UpdateSafe(UpdateSafeArgs {
        owners,
        approvals_required,
    })
    .into_instruction(accounts, program_id)
}

// Owner management runs inside a proposal; the program signs for the safe signer.
fn safe_management_accounts(safe: Pubkey, safe_signer: Pubkey) -> Vec<AccountMeta> {
    vec![
        AccountMeta::new(safe, false),
        AccountMeta::new_readonly(safe_signer, false),
    ]
}

/// Add an owner to a safe (to be embedded in a proposal)
pub fn add_owner(
    safe_signer: Pubkey,
    safe: Pubkey,
    owner: Pubkey,
    program_id: Option<Pubkey>,
) -> SafeResult<Instruction> {
    SafeInstruction::AddOwner(OwnerArgs { owner })
        .into_instruction(safe_management_accounts(safe, safe_signer), program_id)
}

/// Remove an owner from a safe (to be embedded in a proposal)
pub fn remove_owner(
    safe_signer: Pubkey,
    safe: Pubkey,
    owner: Pubkey,
    program_id: Option<Pubkey>,
) -> SafeResult<Instruction> {
    SafeInstruction::RemoveOwner(OwnerArgs { owner })
        .into_instruction(safe_management_accounts(safe, safe_signer), program_id)
}

/// Change the approval threshold (to be embedded in a proposal)
pub fn change_threshold(
    safe_signer: Pubkey,
    safe: Pubkey,
    threshold: u8,
    program_id: Option<Pubkey>,
) -> SafeResult<Instruction> {
    SafeInstruction::ChangeThreshold(ChangeThresholdArgs { threshold })
        .into_instruction(safe_management_accounts(safe, safe_signer), program_id)
}

/// Create a new flow
///
/// # Arguments
/// * `requested_by` - Proposal creator and rent payer
/// * `account_size` - Size of the flow account
/// * `client_flow` - Wire record of the job
/// * `safe` - Safe the flow belongs to
/// * `flow` - New flow account (must be signer)
/// * `program_id` - Optional custom program ID
pub fn create_flow(
    requested_by: Pubkey,
    account_size: u32,
    client_flow: SerializableJob,
    safe: Pubkey,
    flow: Pubkey,
    program_id: Option<Pubkey>,
) -> SafeResult<Instruction> {
    let accounts = vec![
        AccountMeta::new(flow, true),
        AccountMeta::new_readonly(safe, false),
        AccountMeta::new(requested_by, true),
        AccountMeta::new_readonly(system_program::ID, false),
    ];

    SafeInstruction::CreateFlow(CreateFlowArgs {
        account_size,
        client_flow,
    })
    .into_instruction(accounts, program_id)
}

/// Delete a flow (creator only)
pub fn delete_flow(
    requested_by: Pubkey,
    flow: Pubkey,
    program_id: Option<Pubkey>,
) -> SafeResult<Instruction> {
    let accounts = vec![AccountMeta::new(flow, false), AccountMeta::new(requested_by, true)];
    SafeInstruction::DeleteFlow.into_instruction(accounts, program_id)
}

/// Abort a recurring flow
pub fn abort_flow(
    flow: Pubkey,
    safe: Pubkey,
    requested_by: Pubkey,
    program_id: Option<Pubkey>,
) -> SafeResult<Instruction> {
    let accounts = vec![
        AccountMeta::new(flow, false),
        AccountMeta::new_readonly(safe, false),
        AccountMeta::new(requested_by, true),
    ];
    SafeInstruction::AbortFlow.into_instruction(accounts, program_id)
}

fn vote(
    safe: Pubkey,
    flow: Pubkey,
    caller: Pubkey,
    is_approved: bool,
    program_id: Option<Pubkey>,
) -> SafeResult<Instruction> {
    let accounts = vec![
        AccountMeta::new_readonly(safe, false),
        AccountMeta::new(flow, false),
        AccountMeta::new(caller, true),
    ];
    SafeInstruction::ApproveProposal(ApproveProposalArgs { is_approved })
        .into_instruction(accounts, program_id)
}

/// Approve a proposal
pub fn approve_proposal(
    safe: Pubkey,
    flow: Pubkey,
    caller: Pubkey,
    program_id: Option<Pubkey>,
) -> SafeResult<Instruction> {
    vote(safe, flow, caller, true, program_id)
}

/// Reject a proposal
pub fn reject_proposal(
    safe: Pubkey,
    flow: Pubkey,
    caller: Pubkey,
    program_id: Option<Pubkey>,
) -> SafeResult<Instruction> {
    vote(safe, flow, caller, false, program_id)
}

/// Append an action to a pending flow
pub fn add_action(
    flow: Pubkey,
    requested_by: Pubkey,
    action: ActionRecord,
    program_id: Option<Pubkey>,
) -> SafeResult<Instruction> {
    let accounts = vec![AccountMeta::new(flow, false), AccountMeta::new(requested_by, true)];
    SafeInstruction::AddAction(AddActionArgs { action }).into_instruction(accounts, program_id)
}

/// Accounts the program needs to replay `actions`
///
/// Each action contributes its own accounts followed by its program as a read-only
/// non-signer. The safe signer is never flagged as a signer: the program signs for it.
/// Every other account keeps its signer flag on purpose, so an action that names a
/// third-party signer needs that signature on the execute transaction.
pub fn execution_accounts(actions: &[ActionRecord], safe_signer: &Pubkey) -> Vec<AccountMeta> {
    let mut accounts = Vec::new();
    for action in actions {
        for record in &action.accounts {
            let mut meta = AccountMeta::from(record);
            if meta.pubkey == *safe_signer {
                meta.is_signer = false;
            }
            accounts.push(meta);
        }
        accounts.push(AccountMeta::new_readonly(action.program, false));
    }
    accounts
}

/// Execute an approved flow
///
/// # Arguments
/// * `flow` - Flow to execute
/// * `safe` - Safe the flow belongs to
/// * `safe_signer` - Safe signer PDA
/// * `caller` - Executing owner
/// * `actions` - The flow's actions, in order
/// * `program_id` - Optional custom program ID
pub fn execute_multisig_flow(
    flow: Pubkey,
    safe: Pubkey,
    safe_signer: Pubkey,
    caller: Pubkey,
    actions: &[ActionRecord],
    program_id: Option<Pubkey>,
) -> SafeResult<Instruction> {
    let mut accounts = vec![
        AccountMeta::new(flow, false),
        AccountMeta::new_readonly(safe, false),
        AccountMeta::new(safe_signer, false),
        AccountMeta::new(caller, true),
        AccountMeta::new_readonly(system_program::ID, false),
    ];
    accounts.extend(execution_accounts(actions, &safe_signer));

    SafeInstruction::ExecuteMultisigFlow.into_instruction(accounts, program_id)
}

/// Memo marking a manual execution
pub fn execution_memo() -> Instruction {
    Instruction {
        program_id: crate::memo_program_id(),
        accounts: vec![],
        data: EXECUTION_MEMO.to_vec(),
    }
}
