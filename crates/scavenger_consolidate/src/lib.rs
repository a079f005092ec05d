//! scavenger_consolidate — move accumulated Scavenger solution credit onto one address.
//!
//! Picks donor addresses from the local receipts ledger, signs the transfer message with
//! each donor's key, and submits the proof to the rewards service (or renders a curl
//! command in dry-run mode).

pub mod address;
pub mod ledger;
pub mod orchestrator;
pub mod proof;
pub mod submit;
pub mod wallet;

pub use ledger::{solution_totals, JsonlReceipts, Receipt, ReceiptSource};
pub use orchestrator::{
    ApiResponse, ConsolidateError, ConsolidationRequest, ConsolidationResponse, Consolidator,
    ProofRequest, ProofResponse, ProofResult,
};
pub use proof::{Clock, SystemClock};
pub use submit::{HttpTransport, SubmissionClient, SubmitConfig, TokioSleeper};
pub use wallet::{DerivedAddress, Keystore, UnlockedWallet, WalletError, WalletProvider};
