//! On-chain account structures for the Snowflake Safe program
//!
//! Both account kinds start with the 8-byte Anchor discriminator
//! `sha256("account:<Name>")[..8]`, followed by the borsh encoded body.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::{hash::hash, pubkey::Pubkey};

use crate::{
    codec::SerializableJob,
    error::{SafeError, SafeResult},
    job::MultisigJob,
};

/// Length of the Anchor account discriminator
pub const DISCRIMINATOR_LEN: usize = 8;

/// Byte offset of the safe address inside a flow account
/// (discriminator, then `requested_by`)
pub const FLOW_SAFE_OFFSET: usize = DISCRIMINATOR_LEN + 32;

/// Byte offset of the requester address inside a flow account
pub const FLOW_REQUESTED_BY_OFFSET: usize = DISCRIMINATOR_LEN;

/// Anchor account discriminator for the account type `name`
pub fn account_discriminator(name: &str) -> [u8; 8] {
    let preimage = format!("account:{}", name);
    let hash_result = hash(preimage.as_bytes());
    let mut discriminator = [0u8; 8];
    discriminator.copy_from_slice(&hash_result.to_bytes()[..8]);
    discriminator
}

fn account_body<'a>(data: &'a [u8], name: &str) -> SafeResult<&'a [u8]> {
    if data.len() < DISCRIMINATOR_LEN {
        return Err(SafeError::InvalidAccountData(
            "Account data too short".to_string(),
        ));
    }
    if data[..DISCRIMINATOR_LEN] != account_discriminator(name) {
        return Err(SafeError::InvalidAccountData(format!(
            "Account is not a {}",
            name
        )));
    }
    Ok(&data[DISCRIMINATOR_LEN..])
}

/// The multisig safe account
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Safe {
    /// Number of approvals needed to execute a proposal
    pub approvals_required: u8,
    /// Creator and payer of the safe
    pub creator: Pubkey,
    /// Unix timestamp of creation
    pub created_at: i64,
    /// Bump of the safe signer PDA
    pub signer_nonce: u8,
    /// Incremented on every owner or threshold change; stale approvals are discarded
    pub owner_set_seqno: u32,
    pub extra: String,
    /// Owners in insertion order
    pub owners: Vec<Pubkey>,
}

impl Safe {
    pub const ACCOUNT_NAME: &'static str = "Safe";

    /// Deserialize a Safe account from raw account data
    pub fn try_from_account_data(data: &[u8]) -> SafeResult<Self> {
        let mut body = account_body(data, Self::ACCOUNT_NAME)?;
        // Trailing bytes are unused account space
        Self::deserialize(&mut body).map_err(|_| SafeError::DeserializationError)
    }

    /// Serialize into raw account data, discriminator included
    pub fn to_account_data(&self) -> SafeResult<Vec<u8>> {
        let mut data = account_discriminator(Self::ACCOUNT_NAME).to_vec();
        self.serialize(&mut data)?;
        Ok(data)
    }

    /// Check if a pubkey is an owner
    pub fn is_owner(&self, pubkey: &Pubkey) -> bool {
        self.owners.contains(pubkey)
    }

    /// Whether `approvals` approving votes are enough to execute
    pub fn is_threshold_met(&self, approvals: usize) -> bool {
        approvals >= usize::from(self.approvals_required)
    }
}

/// A flow (proposal) account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flow;

impl Flow {
    pub const ACCOUNT_NAME: &'static str = "Flow";

    /// Decode the wire record stored in a flow account
    pub fn try_record_from_account_data(data: &[u8]) -> SafeResult<SerializableJob> {
        let mut body = account_body(data, Self::ACCOUNT_NAME)?;
        SerializableJob::deserialize(&mut body).map_err(|_| SafeError::DeserializationError)
    }

    /// Decode a flow account into the job living at `address`
    pub fn try_job_from_account_data(data: &[u8], address: Pubkey) -> SafeResult<MultisigJob> {
        Self::try_record_from_account_data(data)?.into_job(address)
    }

    /// Serialize a wire record into raw account data, padded to `account_size`
    pub fn to_account_data(record: &SerializableJob, account_size: usize) -> SafeResult<Vec<u8>> {
        let mut data = account_discriminator(Self::ACCOUNT_NAME).to_vec();
        record.serialize(&mut data)?;
        if data.len() < account_size {
            data.resize(account_size, 0);
        }
        Ok(data)
    }
}
