//! Program Derived Address (PDA) utilities for the Snowflake Safe program
//!
//! The safe signer is the program's own authority over a safe: proposals execute their
//! actions with this address as signer, without any private key held off-chain.

use solana_sdk::pubkey::Pubkey;

use crate::seeds::SEED_SAFE_SIGNER;

/// Get the safe signer PDA
///
/// # Arguments
/// * `safe` - The safe account public key
/// * `program_id` - Optional custom program ID (uses canonical ID if None)
///
/// # Returns
/// Tuple of (PDA pubkey, bump seed)
pub fn get_safe_signer_pda(safe: &Pubkey, program_id: Option<&Pubkey>) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[SEED_SAFE_SIGNER, safe.as_ref()],
        program_id.unwrap_or(&crate::program_id()),
    )
}
