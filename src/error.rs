//! Error types for the Snowflake Safe client library

use solana_sdk::signature::Signature;
use thiserror::Error;

/// Result type for Snowflake Safe operations
pub type SafeResult<T> = Result<T, SafeError>;

/// Errors that can occur when using the Snowflake Safe client
#[derive(Debug, Error)]
pub enum SafeError {
    /// Error from the Solana client
    #[error("Solana client error: {0}")]
    ClientError(#[from] solana_client::client_error::ClientError),

    /// Transport-level failure reported by a ledger implementation
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Failed to deserialize account data
    #[error("Failed to deserialize account data")]
    DeserializationError,

    /// Failed to serialize data
    #[error("Failed to serialize data: {0}")]
    SerializationError(std::io::Error),

    /// Account not found
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Invalid account data
    #[error("Invalid account data: {0}")]
    InvalidAccountData(String),

    /// A wire integer did not fit the native field type
    #[error("Numeric field {field} out of range: {value}")]
    NumericOverflow {
        /// Name of the offending field
        field: &'static str,
        /// Decimal rendering of the wire value
        value: String,
    },

    /// The job was already created on-chain
    #[error("Job already has an address, it cannot be created again")]
    JobAlreadyHasIdentity,

    /// The job has never been created on-chain
    #[error("Job has no address, it must be created before it can be updated")]
    JobHasNoIdentity,

    /// Initial fund requested on a job paid from the fee account
    #[error("Initial fund can only be set on a self-funded job")]
    NotSelfFunded,

    /// Invalid approvals required
    #[error("Invalid approvals required: {approvals_required} for {owners} owner(s)")]
    InvalidApprovalsRequired {
        /// Requested threshold
        approvals_required: u8,
        /// Number of owners supplied
        owners: usize,
    },

    /// Nothing to send
    #[error("No instructions to send")]
    EmptyInstructions,

    /// A single instruction does not fit into one transaction
    #[error("Transaction size exceeds limit ({size} > {limit} bytes), unable to split further")]
    TransactionTooLarge {
        /// Serialized size of the unsigned transaction
        size: usize,
        /// Maximum allowed size
        limit: usize,
    },

    /// The blockhash expired before the transaction was confirmed
    #[error("Transaction {signature} expired: {reason}")]
    TransactionExpired {
        /// Signature of the expired transaction
        signature: Signature,
        /// Expiry reason ("block height exceeded" or "timeout exceeded")
        reason: String,
    },

    /// The transaction landed but the program rejected it
    #[error("Raw transaction {signature} failed ({error}): {}", logs.join("; "))]
    TransactionFailed {
        /// Signature of the failed transaction
        signature: Signature,
        /// Transaction error reported by the ledger
        error: String,
        /// Program error lines extracted from the execution logs
        logs: Vec<String>,
    },

    /// Signing failed
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<std::io::Error> for SafeError {
    fn from(err: std::io::Error) -> Self {
        SafeError::SerializationError(err)
    }
}

impl From<bincode::Error> for SafeError {
    fn from(err: bincode::Error) -> Self {
        SafeError::SerializationError(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            err.to_string(),
        ))
    }
}

impl From<solana_sdk::signer::SignerError> for SafeError {
    fn from(err: solana_sdk::signer::SignerError) -> Self {
        SafeError::Signing(err.to_string())
    }
}

impl SafeError {
    /// Whether re-assembling the request with a fresh blockhash may succeed
    pub fn is_expiry(&self) -> bool {
        matches!(self, SafeError::TransactionExpired { .. })
    }
}
