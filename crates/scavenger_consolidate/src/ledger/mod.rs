//! Receipts ledger access and donor eligibility.

mod eligibility;
mod receipts;

pub use eligibility::{select_donors, solution_totals, DonorCandidate, SelectionError};
pub use receipts::{JsonlReceipts, LedgerError, Receipt, ReceiptSource};
