//! Network and sleep seams for the submission loop.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request: {0}")]
    Request(#[from] reqwest::Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` as JSON. Any HTTP status is `Ok`; `Err` means no response arrived.
    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<RawResponse, TransportError>;
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// reqwest transport. The client is built on the first request, so commands that never
/// submit do not pay for TLS setup.
pub struct HttpTransport {
    timeout: Duration,
    client: OnceCell<reqwest::Client>,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            client: OnceCell::new(),
        }
    }

    async fn client(&self) -> Result<&reqwest::Client, TransportError> {
        let client = self
            .client
            .get_or_try_init(|| async {
                reqwest::Client::builder()
                    .use_rustls_tls()
                    .timeout(self.timeout)
                    .build()
            })
            .await?;
        Ok(client)
    }

    #[cfg(test)]
    fn is_connected(&self) -> bool {
        self.client.initialized()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<RawResponse, TransportError> {
        let res = self.client().await?.post(url).json(body).send().await?;
        let status = res.status().as_u16();
        let body = res.text().await?;
        Ok(RawResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn client_is_built_on_first_request() {
        let transport = HttpTransport::new(Duration::from_secs(1));
        assert!(!transport.is_connected());
        let err = transport
            .post_json("not a url", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Request(_)));
        assert!(transport.is_connected());
    }
}
