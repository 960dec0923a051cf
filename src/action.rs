//! Serializable actions
//!
//! An [`ActionRecord`] is the wire form of a Solana [`Instruction`] stored inside a flow
//! account. It carries the instruction verbatim plus a small dispatch tag and optional
//! name/extra strings the program and its operators use for bookkeeping.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};

use crate::types::CUSTOM_ACTION_CODE;

/// Account reference as stored by the program
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct AccountRecord {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl From<&AccountMeta> for AccountRecord {
    fn from(meta: &AccountMeta) -> Self {
        Self {
            pubkey: meta.pubkey,
            is_signer: meta.is_signer,
            is_writable: meta.is_writable,
        }
    }
}

impl From<&AccountRecord> for AccountMeta {
    fn from(record: &AccountRecord) -> Self {
        AccountMeta {
            pubkey: record.pubkey,
            is_signer: record.is_signer,
            is_writable: record.is_writable,
        }
    }
}

/// Optional dispatch metadata attached to an instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMetadata {
    /// Action code the program dispatches on
    pub code: u8,
    /// Human readable name
    pub name: String,
    /// Free-form extra data
    pub extra: String,
}

impl Default for ActionMetadata {
    fn default() -> Self {
        Self {
            code: CUSTOM_ACTION_CODE,
            name: String::new(),
            extra: String::new(),
        }
    }
}

/// Wire form of an instruction
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ActionRecord {
    /// Program the instruction targets
    pub program: Pubkey,
    /// Raw instruction data
    pub instruction: Vec<u8>,
    /// Accounts in instruction order
    pub accounts: Vec<AccountRecord>,
    /// Dispatch tag, [`CUSTOM_ACTION_CODE`] when unknown
    pub action_code: u8,
    pub name: String,
    pub extra: String,
}

impl ActionRecord {
    /// Convert an instruction with default metadata
    pub fn from_instruction(instruction: &Instruction) -> Self {
        Self::from_instruction_with(instruction, ActionMetadata::default())
    }

    /// Convert an instruction, tagging it with the given metadata
    pub fn from_instruction_with(instruction: &Instruction, metadata: ActionMetadata) -> Self {
        Self {
            program: instruction.program_id,
            instruction: instruction.data.clone(),
            accounts: instruction.accounts.iter().map(AccountRecord::from).collect(),
            action_code: metadata.code,
            name: metadata.name,
            extra: metadata.extra,
        }
    }

    /// Rebuild the executable instruction, dropping the metadata
    pub fn to_instruction(&self) -> Instruction {
        Instruction {
            program_id: self.program,
            accounts: self.accounts.iter().map(AccountMeta::from).collect(),
            data: self.instruction.clone(),
        }
    }

    pub fn metadata(&self) -> ActionMetadata {
        ActionMetadata {
            code: self.action_code,
            name: self.name.clone(),
            extra: self.extra.clone(),
        }
    }
}

impl From<&Instruction> for ActionRecord {
    fn from(instruction: &Instruction) -> Self {
        Self::from_instruction(instruction)
    }
}

impl From<&ActionRecord> for Instruction {
    fn from(action: &ActionRecord) -> Self {
        action.to_instruction()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_instruction() -> Instruction {
        Instruction {
            program_id: Pubkey::new_unique(),
            accounts: vec![
                AccountMeta::new(Pubkey::new_unique(), true),
                AccountMeta::new_readonly(Pubkey::new_unique(), false),
                AccountMeta::new(Pubkey::new_unique(), false),
            ],
            data: vec![0x74, 0xb8, 0x9f, 0xce, 0xb3, 0xe0, 0xb2, 0x2a],
        }
    }

    #[test]
    fn test_instruction_round_trip() {
        let ix = sample_instruction();
        let action = ActionRecord::from_instruction(&ix);
        assert_eq!(action.to_instruction(), ix);
    }

    #[test]
    fn test_default_metadata() {
        let action = ActionRecord::from(&sample_instruction());
        assert_eq!(action.action_code, CUSTOM_ACTION_CODE);
        assert!(action.name.is_empty());
        assert!(action.extra.is_empty());
    }

    #[test]
    fn test_metadata_preserved_on_record_round_trip() {
        let metadata = ActionMetadata {
            code: 7,
            name: "deposit".to_string(),
            extra: "vault=1".to_string(),
        };
        let action = ActionRecord::from_instruction_with(&sample_instruction(), metadata.clone());
        let again = ActionRecord::from_instruction_with(&action.to_instruction(), action.metadata());
        assert_eq!(again, action);
        assert_eq!(again.metadata(), metadata);
    }

    #[test]
    fn test_empty_accounts_and_data() {
        let ix = Instruction {
            program_id: Pubkey::new_unique(),
            accounts: vec![],
            data: vec![],
        };
        let action = ActionRecord::from_instruction(&ix);
        let bytes = borsh::to_vec(&action).unwrap();
        let decoded: ActionRecord = borsh::from_slice(&bytes).unwrap();
        assert_eq!(Instruction::from(&decoded), ix);
    }
}
