mod helpers;

use reqwest::Method;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use atlas_janitor::RequestOutcome;
use helpers::mock_atlas::{test_api, test_client};

#[tokio::test]
async fn rate_limited_requests_are_retried_until_success() {
    let server = MockServer::start().await;

    // First two answers are 429, then the endpoint recovers.
    Mock::given(method("GET"))
        .and(path("/orgs"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/orgs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let outcome = client.execute_with_retry(Method::GET, "/orgs", None).await;
    assert!(matches!(outcome, RequestOutcome::Success(Some(_))));
}

#[tokio::test]
async fn rate_limit_exhaustion_becomes_terminal_failure() {
    let server = MockServer::start().await;

    // Initial attempt plus three retries.
    Mock::given(method("GET"))
        .and(path("/orgs"))
        .respond_with(ResponseTemplate::new(429))
        .expect(4)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let outcome = client.execute_with_retry(Method::GET, "/orgs", None).await;
    match outcome {
        RequestOutcome::Failure { status, message } => {
            assert_eq!(status, Some(429));
            assert!(message.contains("exhausted"));
        }
        other => panic!("expected terminal failure, got {other:?}"),
    }
}

#[tokio::test]
async fn retry_after_header_is_honored() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/orgs"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/orgs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let outcome = client.execute_with_retry(Method::GET, "/orgs", None).await;
    assert!(outcome.is_success());
}

#[tokio::test]
async fn conflict_on_create_counts_as_already_exists() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/groups"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": 409,
            "errorCode": "GROUP_ALREADY_EXISTS",
            "detail": "Group already exists",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = test_api(&server);
    let outcome = api.create_project("sandbox-a@x.com", "a@x.com").await;
    match outcome {
        RequestOutcome::AlreadyExists(code) => assert_eq!(code, "GROUP_ALREADY_EXISTS"),
        other => panic!("expected AlreadyExists, got {other:?}"),
    }
}

#[tokio::test]
async fn no_content_delete_is_payloadless_success() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/groups/p1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let api = test_api(&server);
    let outcome = api.delete_project("p1").await;
    assert!(matches!(outcome, RequestOutcome::Success(None)));
}

#[tokio::test]
async fn non_conflict_client_error_is_terminal() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/groups/p1"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": 404,
            "errorCode": "GROUP_NOT_FOUND",
            "detail": "No group with ID p1 exists",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = test_api(&server);
    let outcome = api.delete_project("p1").await;
    match outcome {
        RequestOutcome::Failure { status, message } => {
            assert_eq!(status, Some(404));
            assert_eq!(message, "No group with ID p1 exists");
        }
        other => panic!("expected Failure, got {other:?}"),
    }
}

#[tokio::test]
async fn verify_credentials_accepts_configured_org() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/orgs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"id": "org-1", "name": "Test Org"}],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = test_api(&server);
    assert!(api.verify_credentials().await.is_ok());
}

#[tokio::test]
async fn verify_credentials_rejects_inaccessible_org() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/orgs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"id": "some-other-org"}],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = test_api(&server);
    let err = api.verify_credentials().await.unwrap_err();
    assert!(err.is_config_error());
}
