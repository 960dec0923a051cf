//! # Snowflake Safe Client
//!
//! A Rust client library for the Snowflake Safe multisig program on Solana.
//! It builds proposal ("flow") payloads, packs them into size-bounded transactions and
//! submits them with background rebroadcast until confirmation or expiry.
//!
//! ## Features
//!
//! - **Job codec**: Lossless conversion between [`job::MultisigJob`] and the program's wire record
//! - **Instruction builders**: One builder per program operation, Anchor encoded
//! - **Adaptive sending**: Oversized instruction lists are split into several transactions
//! - **Async Support**: Ledger/wallet traits, sender and facade behind the `async` feature
//! - **PDA Utilities**: Safe signer derivation
//!
//! ## Usage
//!
//! ```rust
//! use snowflake_safe_client::{job_builder::MultisigJobBuilder, codec, pda};
//! use solana_sdk::pubkey::Pubkey;
//!
//! // Derive the signer of a safe
//! let safe = Pubkey::new_unique();
//! let (safe_signer, bump) = pda::get_safe_signer_pda(&safe, None);
//!
//! // Encode a job for the program
//! let job = MultisigJobBuilder::new().job_name("rent").schedule_once(1_800_000_000).build();
//! let record = codec::to_wire(&job);
//! assert_eq!(record.name, "rent");
//! ```

pub mod accounts;
pub mod action;
pub mod bignum;
pub mod codec;
pub mod config;
pub mod error;
pub mod instructions;
pub mod job;
pub mod job_builder;
pub mod pda;
pub mod types;
pub mod utils;

#[cfg(feature = "async")]
pub mod client;
#[cfg(feature = "async")]
pub mod finder;
#[cfg(feature = "async")]
pub mod rpc;
#[cfg(feature = "async")]
pub mod sender;
#[cfg(feature = "async")]
pub mod wallet;

#[cfg(all(test, feature = "async"))]
pub(crate) mod mock;

// Re-export commonly used types
pub use action::ActionRecord;
pub use codec::SerializableJob;
pub use error::{SafeError, SafeResult};
pub use job::MultisigJob;
pub use job_builder::MultisigJobBuilder;
pub use types::{ApprovalRecord, FeeSource, ProposalState, TriggerType};

/// The canonical Snowflake Safe program ID on mainnet-beta
pub const SNOWFLAKE_SAFE_PROGRAM_ID: &str = "HAD4YK6z3mFEYaFd82Ln2aVTUp3rt1ifXBHbFLfoot83";

/// SPL memo program
pub const MEMO_PROGRAM_ID: &str = "Memo1UhkJRfHyvLMcVucJwxXeuD728EqVDDwQDxFMNo";

/// SPL associated token account program
pub const ASSOCIATED_TOKEN_PROGRAM_ID: &str = "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL";

/// Maximum serialized transaction size accepted by the network
pub const MAX_TRANSACTION_SIZE: usize = 1232;

/// Seed constants for PDA derivation
pub mod seeds {
    pub const SEED_SAFE_SIGNER: &[u8] = b"SafeSigner";
}

/// Returns the canonical Snowflake Safe program ID
pub fn program_id() -> solana_sdk::pubkey::Pubkey {
    SNOWFLAKE_SAFE_PROGRAM_ID.parse().unwrap()
}

/// Returns the SPL memo program ID
pub fn memo_program_id() -> solana_sdk::pubkey::Pubkey {
    MEMO_PROGRAM_ID.parse().unwrap()
}

/// Returns the SPL associated token account program ID
pub fn associated_token_program_id() -> solana_sdk::pubkey::Pubkey {
    ASSOCIATED_TOKEN_PROGRAM_ID.parse().unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_ids_parse() {
        assert_eq!(program_id().to_string(), SNOWFLAKE_SAFE_PROGRAM_ID);
        assert_eq!(memo_program_id().to_string(), MEMO_PROGRAM_ID);
        assert_eq!(associated_token_program_id().to_string(), ASSOCIATED_TOKEN_PROGRAM_ID);
    }
}
