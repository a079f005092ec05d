//! Wallet capability: unlock derived addresses with a password and sign with their keys.

mod keystore;

pub use keystore::Keystore;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("wrong password")]
    Authentication,
    #[error("signing failed for index {index}: {reason}")]
    Signing { index: u32, reason: String },
    #[error("keystore io: {0}")]
    Io(#[from] std::io::Error),
    #[error("keystore format: {0}")]
    Format(String),
}

/// Address derived from the wallet seed. Immutable for a given seed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedAddress {
    pub index: u32,
    pub bech32: String,
    pub public_key_hex: String,
    #[serde(default)]
    pub registered: bool,
}

/// Source of wallets. `load_wallet` fails with [`WalletError::Authentication`] on a bad password.
pub trait WalletProvider: Send + Sync {
    fn load_wallet(&self, password: &str) -> Result<Arc<dyn UnlockedWallet>, WalletError>;
}

/// Wallet unlocked for the lifetime of one request.
pub trait UnlockedWallet: Send + Sync {
    fn addresses(&self) -> &[DerivedAddress];

    /// Sign `message` with the key at `index`. Blocking; may be CPU-bound.
    fn sign_message(&self, index: u32, message: &str) -> Result<String, WalletError>;

    fn address(&self, index: u32) -> Option<&DerivedAddress> {
        self.addresses().iter().find(|a| a.index == index)
    }
}
