//! Atlas API connection configuration.
//!
//! Credentials and endpoint settings are carried in an explicit
//! [`AtlasConfig`] struct passed to the client at construction, rather than
//! read lazily from process-wide state. Validation happens before any
//! network call is made.

use serde::{Deserialize, Serialize};

use crate::error::{JanitorError, JanitorResult};

/// Default Atlas Admin API v2 base URL.
pub const DEFAULT_BASE_URL: &str = "https://cloud.mongodb.com/api/atlas/v2";

/// Configuration for connecting to the Atlas Admin API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtlasConfig {
    /// API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Programmatic API public key (digest auth username).
    pub public_key: String,

    /// Programmatic API private key (digest auth password).
    pub private_key: String,

    /// Organization the operations act on.
    pub org_id: String,

    /// Per-request timeout in seconds (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// How many times a request is re-issued after a transport error
    /// (connection failure or timeout), default 1.
    #[serde(default = "default_transient_retries")]
    pub transient_retries: u32,

    /// Fixed wait between transport-error retries, in milliseconds
    /// (default: 2000).
    #[serde(default = "default_transient_backoff_ms")]
    pub transient_backoff_ms: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_transient_retries() -> u32 {
    1
}

fn default_transient_backoff_ms() -> u64 {
    2000
}

impl AtlasConfig {
    /// Create a config with the given credentials and default settings.
    #[must_use]
    pub fn new(
        public_key: impl Into<String>,
        private_key: impl Into<String>,
        org_id: impl Into<String>,
    ) -> Self {
        Self {
            base_url: default_base_url(),
            public_key: public_key.into(),
            private_key: private_key.into(),
            org_id: org_id.into(),
            timeout_secs: default_timeout_secs(),
            transient_retries: default_transient_retries(),
            transient_backoff_ms: default_transient_backoff_ms(),
        }
    }

    /// Load configuration from the environment (`ATLAS_PUBLIC_KEY`,
    /// `ATLAS_PRIVATE_KEY`, `ATLAS_ORG_ID`, optional `ATLAS_API_BASE_URL`).
    ///
    /// A `.env` file in the working directory is honored if present.
    ///
    /// # Errors
    ///
    /// Returns [`JanitorError::InvalidConfig`] naming every missing variable.
    pub fn from_env() -> JanitorResult<Self> {
        dotenvy::dotenv().ok();

        let mut missing = Vec::new();
        let mut read = |name: &'static str| match std::env::var(name) {
            Ok(value) if !value.trim().is_empty() => Some(value),
            _ => {
                missing.push(name);
                None
            }
        };

        let public_key = read("ATLAS_PUBLIC_KEY");
        let private_key = read("ATLAS_PRIVATE_KEY");
        let org_id = read("ATLAS_ORG_ID");

        if !missing.is_empty() {
            return Err(JanitorError::invalid_config(format!(
                "missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        let mut config = Self::new(
            public_key.unwrap_or_default(),
            private_key.unwrap_or_default(),
            org_id.unwrap_or_default(),
        );
        if let Ok(base_url) = std::env::var("ATLAS_API_BASE_URL") {
            if !base_url.trim().is_empty() {
                config.base_url = base_url;
            }
        }
        Ok(config)
    }

    /// Override the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the per-request timeout.
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Override the transport-error retry count.
    #[must_use]
    pub fn with_transient_retries(mut self, retries: u32) -> Self {
        self.transient_retries = retries;
        self
    }

    /// Override the wait between transport-error retries.
    #[must_use]
    pub fn with_transient_backoff_ms(mut self, millis: u64) -> Self {
        self.transient_backoff_ms = millis;
        self
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns [`JanitorError::InvalidConfig`] naming every missing field.
    pub fn validate(&self) -> JanitorResult<()> {
        let mut missing = Vec::new();
        if self.public_key.trim().is_empty() {
            missing.push("public_key");
        }
        if self.private_key.trim().is_empty() {
            missing.push("private_key");
        }
        if self.org_id.trim().is_empty() {
            missing.push("org_id");
        }
        if !missing.is_empty() {
            return Err(JanitorError::invalid_config(format!(
                "missing required credentials: {}",
                missing.join(", ")
            )));
        }
        if self.base_url.trim().is_empty() {
            return Err(JanitorError::invalid_config("base_url must not be empty"));
        }
        Ok(())
    }
}
