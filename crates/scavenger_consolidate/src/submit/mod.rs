//! Rewards service client: `donate_to` submission with retries, or a dry-run curl command.

mod client;
mod config;
mod transport;

pub use client::{
    curl_command, is_retryable, parse_body, Submission, SubmissionClient,
};
pub use config::{ConfigError, RetryPolicy, SubmitConfig, DEFAULT_BASE_URL};
pub use transport::{HttpTransport, RawResponse, Sleeper, TokioSleeper, Transport, TransportError};
