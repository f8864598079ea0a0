//! Typed outcome of a single Atlas API call.
//!
//! Every request resolves to a [`RequestOutcome`] rather than an error so
//! callers can treat conflict-on-create as success-equivalent and keep
//! batch operations running through per-item failures.

use serde_json::Value;
use std::time::Duration;

/// Classified result of one HTTP call against the Atlas API.
#[derive(Debug, Clone)]
pub enum RequestOutcome {
    /// 2xx response; payload is the parsed JSON body if there was one
    /// (204 and empty bodies yield `None`).
    Success(Option<Value>),

    /// 409 response carrying a recognized already-exists error code.
    /// Treated as success-equivalent for idempotent provisioning flows.
    AlreadyExists(String),

    /// 429 response; `retry_after` is the server-mandated wait if a
    /// `Retry-After` header was present.
    RateLimited { retry_after: Option<Duration> },

    /// Terminal failure: any other non-2xx status, or a transport error
    /// (`status: None`) once transient retries are exhausted.
    Failure {
        status: Option<u16>,
        message: String,
    },
}

impl RequestOutcome {
    /// Create a transport-level failure (no HTTP status available).
    pub fn transport_failure(message: impl Into<String>) -> Self {
        RequestOutcome::Failure {
            status: None,
            message: message.into(),
        }
    }

    /// Whether this outcome counts as success for accounting purposes.
    ///
    /// `AlreadyExists` is success-equivalent: repeating an idempotent
    /// create/invite is safe and must not inflate failure counters.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            RequestOutcome::Success(_) | RequestOutcome::AlreadyExists(_)
        )
    }

    /// Whether this outcome is a rate-limit signal.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, RequestOutcome::RateLimited { .. })
    }

    /// Whether this outcome is a terminal failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, RequestOutcome::Failure { .. })
    }

    /// The parsed JSON payload, if this is a successful outcome with a body.
    #[must_use]
    pub fn payload(&self) -> Option<&Value> {
        match self {
            RequestOutcome::Success(payload) => payload.as_ref(),
            _ => None,
        }
    }

    /// Human-readable reason for a non-success outcome, used when recording
    /// per-item failures in a batch report.
    #[must_use]
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            RequestOutcome::Success(_) | RequestOutcome::AlreadyExists(_) => None,
            RequestOutcome::RateLimited { retry_after } => Some(match retry_after {
                Some(wait) => format!("rate limited (retry after {}s)", wait.as_secs()),
                None => "rate limited".to_string(),
            }),
            RequestOutcome::Failure { status, message } => Some(match status {
                Some(code) => format!("HTTP {code}: {message}"),
                None => message.clone(),
            }),
        }
    }
}
