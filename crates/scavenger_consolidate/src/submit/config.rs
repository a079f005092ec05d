use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://scavenger.prod.gd.midnighttge.io";
const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_SECS: u64 = 1;
const REQUEST_TIMEOUT_SECS: u64 = 30;
const CONCURRENCY: usize = 4;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid base url: {0}")]
    BaseUrl(#[from] url::ParseError),
    #[error("base url must be http or https, got {0}")]
    Scheme(String),
    #[error("initial backoff must be at least 1s")]
    Backoff,
    #[error("concurrency must be at least 1")]
    Concurrency,
}

#[derive(Clone, Debug)]
pub struct SubmitConfig {
    pub base_url: String,
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub request_timeout: Duration,
    /// Donors processed at once.
    pub concurrency: usize,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            max_retries: MAX_RETRIES,
            initial_backoff: Duration::from_secs(INITIAL_BACKOFF_SECS),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            concurrency: CONCURRENCY,
        }
    }
}

impl SubmitConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = url::Url::parse(&self.base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Scheme(url.scheme().to_string()));
        }
        self.retry_policy().validate()?;
        if self.concurrency == 0 {
            return Err(ConfigError::Concurrency);
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_backoff: self.initial_backoff,
        }
    }
}

/// Per-donor retry budget. The first retry waits `initial_backoff`, each later one doubles it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_backoff < Duration::from_secs(1) {
            return Err(ConfigError::Backoff);
        }
        Ok(())
    }
}
