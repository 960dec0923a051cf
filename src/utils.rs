//! Instruction helpers

use serde::{Deserialize, Serialize};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};

use crate::error::{SafeError, SafeResult};

/// Whether `ix` only prepares accounts (associated token account creation)
///
/// Setup instructions run before a flow is created instead of inside it.
pub fn is_setup_instruction(ix: &Instruction) -> bool {
    ix.program_id == crate::associated_token_program_id()
}

/// Split into (setup, execute) instructions, keeping relative order
pub fn partition_setup_instructions(
    instructions: Vec<Instruction>,
) -> (Vec<Instruction>, Vec<Instruction>) {
    instructions.into_iter().partition(is_setup_instruction)
}

/// Rough payload estimate: 32 bytes per account reference plus instruction data
pub fn estimate_instruction_bytes(instructions: &[Instruction]) -> usize {
    instructions
        .iter()
        .map(|ix| ix.accounts.len() * 32 + ix.data.len())
        .sum()
}

/// Convert a UI amount to base units, rounding down
///
/// Negative and non-finite amounts yield 0.
pub fn to_lamports_by_decimal(amount: f64, decimals: u8) -> u64 {
    if !amount.is_finite() || amount <= 0.0 {
        return 0;
    }
    (amount * 10f64.powi(i32::from(decimals))).floor() as u64
}

/// Account reference in the JSON instruction format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedAccountMeta {
    pub pubkey: String,
    pub is_writable: bool,
    pub is_signer: bool,
}

/// Byte payload in the JSON instruction format (`{"type":"Buffer","data":[...]}`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedData {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub data: Vec<u8>,
}

/// Instruction as exchanged by wallets and dapps in JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedInstruction {
    pub keys: Vec<SerializedAccountMeta>,
    pub program_id: String,
    pub data: SerializedData,
}

fn parse_pubkey(value: &str) -> SafeResult<Pubkey> {
    value
        .parse()
        .map_err(|e| SafeError::InvalidAccountData(format!("Invalid pubkey {}: {}", value, e)))
}

impl SerializedInstruction {
    pub fn to_instruction(&self) -> SafeResult<Instruction> {
        let accounts = self
            .keys
            .iter()
            .map(|key| {
                Ok(AccountMeta {
                    pubkey: parse_pubkey(&key.pubkey)?,
                    is_signer: key.is_signer,
                    is_writable: key.is_writable,
                })
            })
            .collect::<SafeResult<Vec<_>>>()?;

        Ok(Instruction {
            program_id: parse_pubkey(&self.program_id)?,
            accounts,
            data: self.data.data.clone(),
        })
    }
}

/// Decode JSON instructions and split them into (setup, execute)
pub fn process_serialized_instructions(
    instructions: &[SerializedInstruction],
) -> SafeResult<(Vec<Instruction>, Vec<Instruction>)> {
    let decoded = instructions
        .iter()
        .map(SerializedInstruction::to_instruction)
        .collect::<SafeResult<Vec<_>>>()?;
    Ok(partition_setup_instructions(decoded))
}
