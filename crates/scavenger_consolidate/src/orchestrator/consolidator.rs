//! Drives a request through donor resolution, signing and submission.

use crate::address::{is_valid_address, is_valid_password};
use crate::ledger::{select_donors, solution_totals, DonorCandidate, ReceiptSource};
use crate::orchestrator::types::{
    AddressProof, AddressSummary, ConsolidationRequest, ConsolidationResponse, ProofRequest,
    ProofResponse, ProofResult,
};
use crate::orchestrator::ConsolidateError;
use crate::proof::{sign_donor, synthesized_challenge, transfer_message, Clock, SystemClock};
use crate::submit::{curl_command, RetryPolicy, SubmissionClient, SubmitConfig};
use crate::wallet::{UnlockedWallet, WalletProvider};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{info, warn};

pub struct Consolidator {
    wallet: Arc<dyn WalletProvider>,
    receipts: Arc<dyn ReceiptSource>,
    submitter: Arc<SubmissionClient>,
    clock: Arc<dyn Clock>,
    defaults: RetryPolicy,
    concurrency: usize,
}

/// Everything a donor task needs, shared across the batch.
struct Batch {
    wallet: Arc<dyn UnlockedWallet>,
    submitter: Arc<SubmissionClient>,
    recipient: String,
    message: String,
    dry_run: bool,
    policy: RetryPolicy,
}

impl Consolidator {
    pub fn new(
        wallet: Arc<dyn WalletProvider>,
        receipts: Arc<dyn ReceiptSource>,
        submitter: SubmissionClient,
        config: &SubmitConfig,
    ) -> Self {
        Self {
            wallet,
            receipts,
            submitter: Arc::new(submitter),
            clock: Arc::new(SystemClock),
            defaults: config.retry_policy(),
            concurrency: config.concurrency.max(1),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn unlock(&self, password: &str) -> Result<Arc<dyn UnlockedWallet>, ConsolidateError> {
        if !is_valid_password(password) {
            return Err(ConsolidateError::InvalidPassword);
        }
        Ok(self.wallet.load_wallet(password)?)
    }

    /// Every derived address with its non-dev-fee solution count.
    pub fn list_addresses(&self, password: &str) -> Result<Vec<AddressSummary>, ConsolidateError> {
        let wallet = self.unlock(password)?;
        let totals = solution_totals(&self.receipts.read_receipts()?);
        Ok(wallet
            .addresses()
            .iter()
            .map(|a| AddressSummary {
                index: a.index,
                bech32: a.bech32.clone(),
                public_key_hex: a.public_key_hex.clone(),
                registered: a.registered,
                total_user_solutions: totals.get(&a.bech32).copied().unwrap_or(0),
            })
            .collect())
    }

    /// Sign a challenge with every selected address that has solutions. Nothing is submitted,
    /// and the target address may itself be among the signers.
    pub async fn resolve_proofs(
        &self,
        req: ProofRequest,
    ) -> Result<ProofResponse, ConsolidateError> {
        if !is_valid_password(&req.password) {
            return Err(ConsolidateError::InvalidPassword);
        }
        if let Some(target) = &req.target_address {
            if !is_valid_address(target) {
                return Err(ConsolidateError::InvalidAddress(target.clone()));
            }
        }
        let challenge = match (req.challenge.filter(|c| !c.is_empty()), &req.target_address) {
            (Some(challenge), _) => challenge,
            (None, Some(target)) => synthesized_challenge(target, self.clock.now_utc()),
            (None, None) => return Err(ConsolidateError::MissingTarget),
        };

        let wallet = self.unlock(&req.password)?;
        let totals = solution_totals(&self.receipts.read_receipts()?);
        let donors = select_donors(
            wallet.addresses(),
            &totals,
            req.address_indexes.as_deref(),
            None,
        )?;
        info!(count = donors.len(), "resolving proofs");

        let mut proofs = Vec::with_capacity(donors.len());
        for donor in &donors {
            let signed = sign_donor(wallet.clone(), donor, &challenge).await;
            let public_key_hex = if req.include_public_key {
                wallet.address(donor.index).map(|a| a.public_key_hex.clone())
            } else {
                None
            };
            let (signature, error) = match signed {
                Ok(sig) => (Some(sig), None),
                Err(e) => (None, Some(e.to_string())),
            };
            proofs.push(AddressProof {
                index: donor.index,
                address: donor.bech32.clone(),
                signature,
                total_user_solutions: donor.total_user_solutions,
                public_key_hex,
                error,
            });
        }
        Ok(ProofResponse {
            challenge,
            count: proofs.len(),
            proofs,
        })
    }

    /// Transfer every donor's credit to the recipient. Once donors are resolved each one is
    /// attempted exactly once and its outcome reported in its own entry.
    pub async fn consolidate(
        &self,
        req: ConsolidationRequest,
    ) -> Result<ConsolidationResponse, ConsolidateError> {
        if !is_valid_password(&req.password) {
            return Err(ConsolidateError::InvalidPassword);
        }
        if !is_valid_address(&req.recipient_address) {
            return Err(ConsolidateError::InvalidAddress(req.recipient_address));
        }
        let policy = self.retry_policy(&req)?;

        let wallet = self.unlock(&req.password)?;
        let totals = solution_totals(&self.receipts.read_receipts()?);
        let donors = select_donors(
            wallet.addresses(),
            &totals,
            req.address_indexes.as_deref(),
            Some(req.recipient_address.as_str()),
        )?;

        let message = transfer_message(&req.recipient_address);
        info!(
            donors = donors.len(),
            recipient = %req.recipient_address,
            dry_run = req.dry_run,
            "consolidating"
        );
        let batch = Arc::new(Batch {
            wallet,
            submitter: self.submitter.clone(),
            recipient: req.recipient_address.clone(),
            message: message.clone(),
            dry_run: req.dry_run,
            policy,
        });
        let results = self.process_donors(batch, &donors).await;

        let statuses: HashMap<&str, usize> =
            results.iter().fold(HashMap::new(), |mut acc, r| {
                let key = match (r.signed, r.status) {
                    (false, _) => "unsigned",
                    (true, None) => "dry_run",
                    (true, Some(s)) if (200..300).contains(&s) => "accepted",
                    (true, Some(_)) => "failed",
                };
                *acc.entry(key).or_insert(0) += 1;
                acc
            });
        info!(?statuses, "consolidation finished");

        Ok(ConsolidationResponse {
            dry_run: req.dry_run,
            message,
            recipient_address: req.recipient_address,
            donors: results.len(),
            results,
        })
    }

    fn retry_policy(&self, req: &ConsolidationRequest) -> Result<RetryPolicy, ConsolidateError> {
        let initial_backoff = match req.initial_backoff_seconds {
            Some(secs) if !secs.is_finite() || secs < 1.0 => {
                return Err(ConsolidateError::RetrySettings(format!(
                    "initialBackoffSeconds must be >= 1, got {}",
                    secs
                )))
            }
            Some(secs) => Duration::try_from_secs_f64(secs)
                .map_err(|e| ConsolidateError::RetrySettings(e.to_string()))?,
            None => self.defaults.initial_backoff,
        };
        Ok(RetryPolicy {
            max_retries: req.max_retries.unwrap_or(self.defaults.max_retries),
            initial_backoff,
        })
    }

    /// Fan out one task per donor, at most `concurrency` at a time. Results keep donor order.
    async fn process_donors(
        &self,
        batch: Arc<Batch>,
        donors: &[DonorCandidate],
    ) -> Vec<ProofResult> {
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let handles: Vec<_> = donors
            .iter()
            .cloned()
            .map(|donor| {
                let batch = batch.clone();
                let permits = permits.clone();
                tokio::spawn(async move {
                    let _permit = permits.acquire_owned().await.ok();
                    process_donor(&batch, donor).await
                })
            })
            .collect();

        let mut results = Vec::with_capacity(donors.len());
        for (handle, donor) in handles.into_iter().zip(donors) {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!(index = donor.index, error = %e, "donor task aborted");
                    results.push(ProofResult {
                        index: donor.index,
                        donor: donor.bech32.clone(),
                        total_user_solutions: donor.total_user_solutions,
                        signed: false,
                        signature: None,
                        curl: None,
                        status: None,
                        response: Some(json!({
                            "error": ConsolidateError::Internal(e.to_string()).to_string()
                        })),
                    });
                }
            }
        }
        results
    }
}

async fn process_donor(batch: &Batch, donor: DonorCandidate) -> ProofResult {
    let mut result = ProofResult {
        index: donor.index,
        donor: donor.bech32.clone(),
        total_user_solutions: donor.total_user_solutions,
        signed: false,
        signature: None,
        curl: None,
        status: None,
        response: None,
    };
    let signature = match sign_donor(batch.wallet.clone(), &donor, &batch.message).await {
        Ok(sig) => sig,
        Err(e) => {
            result.response = Some(json!({ "error": e.to_string() }));
            return result;
        }
    };
    result.signed = true;
    if batch.dry_run {
        let url = batch
            .submitter
            .donate_url(&batch.recipient, &donor.bech32, &signature);
        result.curl = Some(curl_command(&url));
    } else {
        let submission = batch
            .submitter
            .submit(&batch.recipient, &donor.bech32, &signature, &batch.policy)
            .await;
        result.status = Some(submission.status);
        result.response = Some(submission.response);
    }
    result.signature = Some(signature);
    result
}
