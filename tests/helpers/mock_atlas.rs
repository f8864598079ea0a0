//! Shared wiremock scaffolding: a client wired to a mock server with
//! zero-delay retries so rate-limit paths run without real sleeps.

use std::time::Duration;

use serde_json::{json, Value};
use wiremock::MockServer;

use atlas_janitor::{AtlasApi, AtlasClient, AtlasConfig, RetryPolicy};

pub const TEST_ORG_ID: &str = "org-1";

pub fn test_config(server: &MockServer) -> AtlasConfig {
    AtlasConfig::new("test-public-key", "test-private-key", TEST_ORG_ID)
        .with_base_url(server.uri())
        .with_timeout_secs(5)
        .with_transient_retries(0)
}

pub fn test_client(server: &MockServer) -> AtlasClient {
    AtlasClient::new(&test_config(server))
        .expect("client should build from test config")
        .with_retry_policy(RetryPolicy::default().with_schedule(vec![Duration::ZERO]))
}

pub fn test_api(server: &MockServer) -> AtlasApi {
    AtlasApi::new(test_client(server), TEST_ORG_ID)
}

/// Paginated list envelope, optionally advertising a next page.
pub fn envelope(results: Value, has_next: bool) -> Value {
    let mut links = vec![json!({"rel": "self", "href": "https://example.test/self"})];
    if has_next {
        links.push(json!({"rel": "next", "href": "https://example.test/next"}));
    }
    json!({"results": results, "links": links, "totalCount": 0})
}
