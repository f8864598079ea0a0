//! HTTP client for the Atlas Admin API.
//!
//! Wraps `reqwest` with digest authentication, outcome classification, and
//! two distinct retry layers:
//!
//! - transport errors (connection failure, timeout) are re-issued a fixed
//!   number of times with a fixed sleep;
//! - 429 responses are retried by [`AtlasClient::execute_with_retry`] using
//!   the [`RetryPolicy`] backoff schedule, honoring `Retry-After`.
//!
//! All other non-2xx statuses are terminal and reported as
//! [`RequestOutcome::Failure`], never raised.

use diqwest::WithDigestAuth;
use reqwest::{header, Client, Method, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::AtlasConfig;
use crate::error::{JanitorError, JanitorResult};
use crate::outcome::RequestOutcome;
use crate::retry::RetryPolicy;

/// Versioned media type the Atlas Admin API expects.
pub const ATLAS_ACCEPT_HEADER: &str = "application/vnd.atlas.2025-02-19+json";

/// Digest-authenticated HTTP client for the Atlas Admin API.
#[derive(Debug, Clone)]
pub struct AtlasClient {
    base_url: String,
    public_key: String,
    private_key: String,
    http: Client,
    retry_policy: RetryPolicy,
    transient_retries: u32,
    transient_backoff: Duration,
}

impl AtlasClient {
    /// Create a new client from the given configuration.
    ///
    /// # Errors
    ///
    /// Fails fast on invalid configuration or if the underlying HTTP client
    /// cannot be built. No network call is made here.
    pub fn new(config: &AtlasConfig) -> JanitorResult<Self> {
        config.validate()?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("atlas-janitor/0.1")
            .build()
            .map_err(|e| JanitorError::HttpClient(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            public_key: config.public_key.clone(),
            private_key: config.private_key.clone(),
            http,
            retry_policy: RetryPolicy::default(),
            transient_retries: config.transient_retries,
            transient_backoff: Duration::from_millis(config.transient_backoff_ms),
        })
    }

    /// Replace the rate-limit retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// The normalized API base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue one request and classify the response.
    ///
    /// Transport errors are re-issued up to the configured transient retry
    /// count with a fixed sleep; once exhausted they surface as
    /// [`RequestOutcome::Failure`] with no status code. Rate limiting is
    /// *not* retried here — use [`AtlasClient::execute_with_retry`].
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> RequestOutcome {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt: u32 = 0;
        loop {
            match self.send(method.clone(), &url, body).await {
                Ok(outcome) => return outcome,
                Err(message) => {
                    if attempt < self.transient_retries {
                        warn!(
                            method = %method,
                            url = %url,
                            attempt = attempt + 1,
                            max_attempts = self.transient_retries + 1,
                            error = %message,
                            "Request failed, retrying after transport error"
                        );
                        tokio::time::sleep(self.transient_backoff).await;
                        attempt += 1;
                    } else {
                        return RequestOutcome::transport_failure(message);
                    }
                }
            }
        }
    }

    /// Issue a request, retrying 429 responses per the retry policy.
    ///
    /// Sleeps for the server-mandated `Retry-After` duration when present,
    /// otherwise follows the backoff schedule. After exhausting retries the
    /// last rate-limit outcome is reclassified as a terminal failure.
    pub async fn execute_with_retry(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> RequestOutcome {
        let mut attempt: u32 = 0;
        loop {
            let outcome = self.execute(method.clone(), path, body).await;
            let RequestOutcome::RateLimited { retry_after } = outcome else {
                return outcome;
            };

            if attempt >= self.retry_policy.max_retries {
                warn!(
                    method = %method,
                    path = %path,
                    attempts = attempt + 1,
                    "Rate limit retries exhausted"
                );
                return RequestOutcome::Failure {
                    status: Some(StatusCode::TOO_MANY_REQUESTS.as_u16()),
                    message: format!(
                        "rate limit retries exhausted after {} attempt(s)",
                        attempt + 1
                    ),
                };
            }

            let delay = self.retry_policy.delay_for(attempt, retry_after);
            debug!(
                method = %method,
                path = %path,
                attempt = attempt + 1,
                max_retries = self.retry_policy.max_retries,
                delay_secs = delay.as_secs_f64(),
                "Rate limited, backing off"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<RequestOutcome, String> {
        debug!(method = %method, url = %url, "Atlas request");

        let mut builder = self
            .http
            .request(method, url)
            .header(header::ACCEPT, ATLAS_ACCEPT_HEADER);
        if let Some(payload) = body {
            builder = builder
                .header(header::CONTENT_TYPE, "application/json")
                .json(payload);
        }

        let response = builder
            .send_with_digest_auth(&self.public_key, &self.private_key)
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);

        // A body that cannot be read is treated as empty rather than fatal.
        let body_text = response.text().await.unwrap_or_default();
        Ok(classify_response(status, retry_after, &body_text))
    }
}

/// Map an HTTP response onto a [`RequestOutcome`].
///
/// Precedence: recognized 409 conflict, then 429, then 2xx, then terminal
/// failure. Non-JSON bodies never fail classification; a 2xx with an
/// unparseable body is a payload-less success.
pub(crate) fn classify_response(
    status: StatusCode,
    retry_after: Option<Duration>,
    body: &str,
) -> RequestOutcome {
    let parsed: Option<Value> = serde_json::from_str(body).ok();

    if status == StatusCode::CONFLICT {
        if let Some(code) = parsed
            .as_ref()
            .and_then(|v| v.get("errorCode"))
            .and_then(Value::as_str)
        {
            if is_already_exists_code(code) {
                debug!(error_code = %code, "Conflict classified as already-exists");
                return RequestOutcome::AlreadyExists(code.to_string());
            }
        }
        return RequestOutcome::Failure {
            status: Some(status.as_u16()),
            message: error_detail(parsed.as_ref(), body),
        };
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        warn!(retry_after = ?retry_after, "Atlas API rate limited");
        return RequestOutcome::RateLimited { retry_after };
    }

    if status.is_success() {
        return RequestOutcome::Success(parsed);
    }

    RequestOutcome::Failure {
        status: Some(status.as_u16()),
        message: error_detail(parsed.as_ref(), body),
    }
}

/// Whether a 409 error code means the resource is already present.
fn is_already_exists_code(code: &str) -> bool {
    code.ends_with("_ALREADY_EXISTS") || code == "DUPLICATE"
}

fn error_detail(parsed: Option<&Value>, body: &str) -> String {
    parsed
        .and_then(|v| v.get("detail"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
            if body.is_empty() {
                "<no body>".to_string()
            } else {
                body.to_string()
            }
        })
}
