//! Signs a donor's message through the wallet capability.

use crate::ledger::DonorCandidate;
use crate::wallet::{UnlockedWallet, WalletError};
use std::sync::Arc;
use tracing::{debug, warn};

/// Sign `message` for `donor` on the blocking pool. A failure stays with this donor.
pub async fn sign_donor(
    wallet: Arc<dyn UnlockedWallet>,
    donor: &DonorCandidate,
    message: &str,
) -> Result<String, WalletError> {
    let index = donor.index;
    let msg = message.to_string();
    let res = tokio::task::spawn_blocking(move || wallet.sign_message(index, &msg))
        .await
        .map_err(|e| WalletError::Signing {
            index,
            reason: format!("signer task failed: {}", e),
        })?;
    match &res {
        Ok(_) => debug!(index, donor = %donor.bech32, "signed"),
        Err(e) => warn!(index, donor = %donor.bech32, error = %e, "signing failed"),
    }
    res
}
