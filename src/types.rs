//! Core types for the Snowflake Safe protocol
//!
//! This module defines the small enumerations and records shared by the job model,
//! the wire codec and the account layouts.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::error::{SafeError, SafeResult};

/// Sentinel for a recurring job that never runs out of executions
pub const RECURRING_FOREVER: i16 = -999;

/// Action code used when an instruction carries no dispatch tag
pub const CUSTOM_ACTION_CODE: u8 = 0;

/// Retry window written on every new flow
pub const RETRY_WINDOW: u32 = 0;

/// Default flow account size in bytes
pub const DEFAULT_FLOW_SIZE: u32 = 1800;

/// What causes a job to be executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TriggerType {
    /// Executed manually once approved
    #[default]
    None = 1,
    /// Executed at a point in time or on a cron schedule
    Time = 2,
    /// Executed when a program condition is met
    ProgramCondition = 3,
}

impl TryFrom<u8> for TriggerType {
    type Error = SafeError;

    fn try_from(value: u8) -> SafeResult<Self> {
        match value {
            1 => Ok(TriggerType::None),
            2 => Ok(TriggerType::Time),
            3 => Ok(TriggerType::ProgramCondition),
            other => Err(SafeError::InvalidAccountData(format!(
                "unknown trigger type {}",
                other
            ))),
        }
    }
}

/// Where execution fees are paid from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FeeSource {
    /// The requester's fee account
    #[default]
    FeeAccount = 0,
    /// The flow account itself, funded at creation
    SelfFunded = 1,
}

impl TryFrom<u8> for FeeSource {
    type Error = SafeError;

    fn try_from(value: u8) -> SafeResult<Self> {
        match value {
            0 => Ok(FeeSource::FeeAccount),
            1 => Ok(FeeSource::SelfFunded),
            other => Err(SafeError::InvalidAccountData(format!(
                "unknown fee source {}",
                other
            ))),
        }
    }
}

/// Lifecycle stage of a proposal, set by the program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProposalState {
    #[default]
    Pending = 0,
    Approved = 1,
    Rejected = 2,
    ExecutionInProgress = 3,
    Complete = 4,
    Failed = 5,
    Aborted = 6,
    Deprecated = 7,
}

impl TryFrom<u8> for ProposalState {
    type Error = SafeError;

    fn try_from(value: u8) -> SafeResult<Self> {
        Ok(match value {
            0 => ProposalState::Pending,
            1 => ProposalState::Approved,
            2 => ProposalState::Rejected,
            3 => ProposalState::ExecutionInProgress,
            4 => ProposalState::Complete,
            5 => ProposalState::Failed,
            6 => ProposalState::Aborted,
            7 => ProposalState::Deprecated,
            other => {
                return Err(SafeError::InvalidAccountData(format!(
                    "unknown proposal state {}",
                    other
                )))
            }
        })
    }
}

/// A single owner's vote on a proposal
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct ApprovalRecord {
    /// Owner who voted
    pub owner: Pubkey,
    /// `true` for approve, `false` for reject
    pub is_approved: bool,
}

impl ApprovalRecord {
    pub fn new(owner: Pubkey, is_approved: bool) -> Self {
        Self { owner, is_approved }
    }
}
