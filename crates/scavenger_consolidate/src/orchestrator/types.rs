//! Request and response shapes exchanged with the surrounding application.

use crate::orchestrator::ConsolidateError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidationRequest {
    pub password: String,
    pub recipient_address: String,
    #[serde(default)]
    pub address_indexes: Option<Vec<u32>>,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub max_retries: Option<u32>,
    #[serde(default)]
    pub initial_backoff_seconds: Option<f64>,
}

impl fmt::Debug for ConsolidationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsolidationRequest")
            .field("password", &"<redacted>")
            .field("recipient_address", &self.recipient_address)
            .field("address_indexes", &self.address_indexes)
            .field("dry_run", &self.dry_run)
            .field("max_retries", &self.max_retries)
            .field("initial_backoff_seconds", &self.initial_backoff_seconds)
            .finish()
    }
}

/// Per-donor outcome. `status`/`response` are absent in dry runs, `curl` only appears there.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofResult {
    pub index: u32,
    pub donor: String,
    pub total_user_solutions: u64,
    pub signed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidationResponse {
    pub dry_run: bool,
    pub message: String,
    pub recipient_address: String,
    pub donors: usize,
    pub results: Vec<ProofResult>,
}

#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofRequest {
    pub password: String,
    #[serde(default)]
    pub address_indexes: Option<Vec<u32>>,
    #[serde(default)]
    pub challenge: Option<String>,
    #[serde(default)]
    pub target_address: Option<String>,
    #[serde(default)]
    pub include_public_key: bool,
}

impl fmt::Debug for ProofRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProofRequest")
            .field("password", &"<redacted>")
            .field("address_indexes", &self.address_indexes)
            .field("challenge", &self.challenge)
            .field("target_address", &self.target_address)
            .field("include_public_key", &self.include_public_key)
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressProof {
    pub index: u32,
    pub address: String,
    pub signature: Option<String>,
    pub total_user_solutions: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key_hex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProofResponse {
    pub challenge: String,
    pub count: usize,
    pub proofs: Vec<AddressProof>,
}

/// Derived address labelled with its credited solutions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSummary {
    pub index: u32,
    pub bech32: String,
    pub public_key_hex: String,
    pub registered: bool,
    pub total_user_solutions: u64,
}

/// Outer envelope. `success` is false only for errors raised before donor processing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Status code and envelope for `result`. Internal errors are reported generically.
    pub fn from_result(result: Result<T, ConsolidateError>) -> (u16, Self) {
        match result {
            Ok(data) => (
                200,
                Self {
                    success: true,
                    data: Some(data),
                    error: None,
                },
            ),
            Err(e) => {
                let status = e.status_code();
                let error = if status >= 500 {
                    tracing::error!(error = %e, "request failed");
                    "internal error".to_string()
                } else {
                    e.to_string()
                };
                (
                    status,
                    Self {
                        success: false,
                        data: None,
                        error: Some(error),
                    },
                )
            }
        }
    }
}
