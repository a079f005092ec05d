//! Per-donor `donate_to` submission under bounded exponential backoff.

use crate::submit::config::{ConfigError, RetryPolicy, SubmitConfig};
use crate::submit::transport::{HttpTransport, Sleeper, TokioSleeper, Transport};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Final outcome of one donor's submission. `status` 0 means no HTTP response was received.
#[derive(Clone, Debug, PartialEq)]
pub struct Submission {
    pub status: u16,
    pub response: Value,
    pub attempts: u32,
}

/// Rate limited or timed out; worth another attempt.
pub fn is_retryable(status: u16) -> bool {
    status == 429 || status == 408
}

/// Decode a response body as JSON, falling back to `{"raw": text}`.
pub fn parse_body(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| json!({ "raw": text }))
}

/// Shell command that reproduces the submission for `url`. The URL is single-quoted so
/// the shell performs no expansion on it.
pub fn curl_command(url: &str) -> String {
    format!(
        "curl -X POST '{}' -H 'Content-Type: application/json' -d '{{}}'",
        url.replace('\'', "'\\''")
    )
}

pub struct SubmissionClient {
    base_url: String,
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
}

impl SubmissionClient {
    pub fn new(
        base_url: impl Into<String>,
        transport: Arc<dyn Transport>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            transport,
            sleeper,
        }
    }

    /// HTTP client with tokio sleeps, as used against the live service.
    pub fn from_config(config: &SubmitConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(
            config.base_url.clone(),
            Arc::new(HttpTransport::new(config.request_timeout)),
            Arc::new(TokioSleeper),
        ))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `<base>/donate_to/<recipient>/<donor>/<signature>`, each segment percent-encoded.
    pub fn donate_url(&self, recipient: &str, donor: &str, signature: &str) -> String {
        format!(
            "{}/donate_to/{}/{}/{}",
            self.base_url,
            urlencoding::encode(recipient),
            urlencoding::encode(donor),
            urlencoding::encode(signature)
        )
    }

    /// Submit one donor's signature. Never fails: the last outcome is always returned.
    pub async fn submit(
        &self,
        recipient: &str,
        donor: &str,
        signature: &str,
        policy: &RetryPolicy,
    ) -> Submission {
        let url = self.donate_url(recipient, donor, signature);
        let body = json!({});
        let mut attempt: u32 = 0;
        let mut backoff = policy.initial_backoff;
        loop {
            attempt += 1;
            let (outcome, retryable) = match self.transport.post_json(&url, &body).await {
                Ok(raw) => {
                    debug!(donor, attempt, status = raw.status, "donate_to response");
                    let retryable = is_retryable(raw.status);
                    let outcome = Submission {
                        status: raw.status,
                        response: parse_body(&raw.body),
                        attempts: attempt,
                    };
                    (outcome, retryable)
                }
                Err(e) => {
                    let outcome = Submission {
                        status: 0,
                        response: json!({ "error": e.to_string() }),
                        attempts: attempt,
                    };
                    (outcome, true)
                }
            };
            if !retryable {
                info!(donor, attempt, status = outcome.status, "donate_to done");
                return outcome;
            }
            if attempt > policy.max_retries {
                warn!(donor, attempt, status = outcome.status, "retries exhausted");
                return outcome;
            }
            warn!(
                donor,
                attempt,
                status = outcome.status,
                backoff_ms = backoff.as_millis() as u64,
                "retrying donate_to"
            );
            self.sleeper.sleep(backoff).await;
            backoff = backoff.saturating_mul(2);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submit::transport::{RawResponse, TransportError};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// A request that never left the machine.
    fn refused() -> TransportError {
        reqwest::Client::new()
            .post("no scheme")
            .build()
            .unwrap_err()
            .into()
    }

    /// Replays scripted outcomes; `None` is a connection failure.
    struct Scripted {
        script: Mutex<VecDeque<Option<(u16, &'static str)>>>,
        urls: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(script: Vec<Option<(u16, &'static str)>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                urls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.urls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn post_json(&self, url: &str, body: &Value) -> Result<RawResponse, TransportError> {
            assert_eq!(body, &json!({}));
            self.urls.lock().unwrap().push(url.to_string());
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Some((status, body))) => Ok(RawResponse {
                    status,
                    body: body.to_string(),
                }),
                Some(None) => Err(refused()),
                None => panic!("unexpected request"),
            }
        }
    }

    #[derive(Default)]
    struct RecordingSleeper(Mutex<Vec<Duration>>);

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.0.lock().unwrap().push(duration);
        }
    }

    fn client(transport: Arc<Scripted>, sleeper: Arc<RecordingSleeper>) -> SubmissionClient {
        SubmissionClient::new("https://rewards.example/", transport, sleeper)
    }

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_backoff: Duration::from_secs(1),
        }
    }

    #[test]
    fn url_encodes_signature_only() {
        let c = client(Scripted::new(vec![]), Arc::default());
        assert_eq!(
            c.donate_url("addr1qrecipient", "addr1qdonor", "a+b/c=="),
            "https://rewards.example/donate_to/addr1qrecipient/addr1qdonor/a%2Bb%2Fc%3D%3D"
        );
    }

    #[test]
    fn address_segments_cannot_escape_the_path() {
        let c = client(Scripted::new(vec![]), Arc::default());
        assert_eq!(
            c.donate_url("addr1/../admin", "addr1\"$(x)\"", "sig"),
            "https://rewards.example/donate_to/addr1%2F..%2Fadmin/addr1%22%24%28x%29%22/sig"
        );
    }

    #[test]
    fn curl_embeds_url() {
        let cmd = curl_command("https://rewards.example/donate_to/a/b/c%2B");
        assert_eq!(
            cmd,
            "curl -X POST 'https://rewards.example/donate_to/a/b/c%2B' -H 'Content-Type: application/json' -d '{}'"
        );
    }

    #[test]
    fn curl_quotes_single_quotes() {
        let cmd = curl_command("https://h/donate_to/it's/$(touch x)/sig");
        assert!(cmd.starts_with("curl -X POST 'https://h/donate_to/it'\\''s/$(touch x)/sig' -H"));
    }

    #[test]
    fn non_json_body_is_wrapped() {
        assert_eq!(parse_body(r#"{"ok":true}"#), json!({"ok": true}));
        assert_eq!(parse_body("Bad Gateway"), json!({"raw": "Bad Gateway"}));
    }

    #[tokio::test]
    async fn retries_429_with_doubling_backoff() {
        let transport = Scripted::new(vec![
            Some((429, "slow down")),
            Some((429, "slow down")),
            Some((200, r#"{"donated":5}"#)),
        ]);
        let sleeper = Arc::new(RecordingSleeper::default());
        let c = client(transport.clone(), sleeper.clone());
        let out = c.submit("addr1qr", "addr1qd", "sig", &policy(3)).await;
        assert_eq!(out.status, 200);
        assert_eq!(out.response, json!({"donated": 5}));
        assert_eq!(out.attempts, 3);
        assert_eq!(transport.calls(), 3);
        assert_eq!(
            *sleeper.0.lock().unwrap(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[tokio::test]
    async fn zero_retries_returns_first_outcome() {
        let transport = Scripted::new(vec![Some((408, ""))]);
        let sleeper = Arc::new(RecordingSleeper::default());
        let out = client(transport.clone(), sleeper.clone())
            .submit("addr1qr", "addr1qd", "sig", &policy(0))
            .await;
        assert_eq!(out.status, 408);
        assert_eq!(out.response, json!({"raw": ""}));
        assert_eq!(transport.calls(), 1);
        assert!(sleeper.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let transport = Scripted::new(vec![Some((400, r#"{"message":"already donated"}"#))]);
        let sleeper = Arc::new(RecordingSleeper::default());
        let out = client(transport.clone(), sleeper.clone())
            .submit("addr1qr", "addr1qd", "sig", &policy(5))
            .await;
        assert_eq!(out.status, 400);
        assert_eq!(out.response["message"], "already donated");
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn network_errors_retry_then_surface_as_status_zero() {
        let transport = Scripted::new(vec![None, None, None]);
        let sleeper = Arc::new(RecordingSleeper::default());
        let out = client(transport.clone(), sleeper.clone())
            .submit("addr1qr", "addr1qd", "sig", &policy(2))
            .await;
        assert_eq!(out.status, 0);
        assert!(out.response["error"]
            .as_str()
            .unwrap()
            .starts_with("request: "));
        assert_eq!(out.attempts, 3);
        assert_eq!(
            *sleeper.0.lock().unwrap(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[tokio::test]
    async fn network_error_then_success() {
        let transport = Scripted::new(vec![None, Some((201, r#"{"status":"ok"}"#))]);
        let sleeper = Arc::new(RecordingSleeper::default());
        let out = client(transport, sleeper)
            .submit("addr1qr", "addr1qd", "sig", &policy(1))
            .await;
        assert_eq!(out.status, 201);
        assert_eq!(out.attempts, 2);
    }
}
