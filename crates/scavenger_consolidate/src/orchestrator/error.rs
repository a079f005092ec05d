use crate::ledger::{LedgerError, SelectionError};
use crate::submit::ConfigError;
use crate::wallet::WalletError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsolidateError {
    #[error("password must not be empty")]
    InvalidPassword,
    #[error("invalid address: {0:?}")]
    InvalidAddress(String),
    #[error("unknown address indexes: {0:?}")]
    UnknownIndexes(Vec<u32>),
    #[error("no eligible donors: {0}")]
    NoEligibleDonors(String),
    #[error("targetAddress is required when no challenge is given")]
    MissingTarget,
    #[error("invalid retry settings: {0}")]
    RetrySettings(String),
    #[error("invalid submission config: {0}")]
    Config(#[from] ConfigError),
    #[error("wrong password")]
    Authentication,
    #[error("wallet: {0}")]
    Wallet(WalletError),
    #[error("ledger: {0}")]
    Ledger(#[from] LedgerError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ConsolidateError {
    /// HTTP-style status for the outer response.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidPassword
            | Self::InvalidAddress(_)
            | Self::UnknownIndexes(_)
            | Self::NoEligibleDonors(_)
            | Self::MissingTarget
            | Self::RetrySettings(_)
            | Self::Config(_) => 400,
            Self::Authentication => 401,
            Self::Wallet(_) | Self::Ledger(_) | Self::Internal(_) => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

impl From<WalletError> for ConsolidateError {
    fn from(e: WalletError) -> Self {
        match e {
            WalletError::Authentication => Self::Authentication,
            other => Self::Wallet(other),
        }
    }
}

impl From<SelectionError> for ConsolidateError {
    fn from(e: SelectionError) -> Self {
        match e {
            SelectionError::UnknownIndexes(idx) => Self::UnknownIndexes(idx),
            SelectionError::NoEligibleDonors(reason) => Self::NoEligibleDonors(reason),
        }
    }
}
