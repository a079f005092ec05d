//! Request-level coordination: resolve donors, sign, submit, aggregate.

mod consolidator;
mod error;
mod types;

pub use consolidator::Consolidator;
pub use error::ConsolidateError;
pub use types::{
    AddressProof, AddressSummary, ApiResponse, ConsolidationRequest, ConsolidationResponse,
    ProofRequest, ProofResponse, ProofResult,
};
