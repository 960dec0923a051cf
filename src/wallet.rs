//! Wallet abstraction
//!
//! The wallet pays fees and adds its signature to every transaction the sender
//! produces. Other required signers are applied by the sender before the wallet signs.

use async_trait::async_trait;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::Transaction,
};

use crate::error::{SafeError, SafeResult};

/// Fee payer with batch signing
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Fee payer address
    fn pubkey(&self) -> Pubkey;

    /// Add the wallet signature to each transaction, keeping signatures already present
    async fn sign_transactions(&self, transactions: &mut [Transaction]) -> SafeResult<()>;
}

/// Local keypair wallet
pub struct KeypairWallet {
    keypair: Keypair,
}

impl KeypairWallet {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }

    pub fn from_bytes(bytes: &[u8]) -> SafeResult<Self> {
        if bytes.len() != 64 {
            return Err(SafeError::Signing(format!(
                "Invalid keypair length: expected 64 bytes, got {}",
                bytes.len()
            )));
        }
        Keypair::try_from(bytes)
            .map(Self::new)
            .map_err(|e| SafeError::Signing(format!("Invalid keypair bytes: {}", e)))
    }
}

#[async_trait]
impl WalletSigner for KeypairWallet {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_transactions(&self, transactions: &mut [Transaction]) -> SafeResult<()> {
        for transaction in transactions.iter_mut() {
            let blockhash = transaction.message.recent_blockhash;
            transaction.try_partial_sign(&[&self.keypair], blockhash)?;
        }
        Ok(())
    }
}
