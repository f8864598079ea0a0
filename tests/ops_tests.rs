mod helpers;

use chrono::{Duration, Utc};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use atlas_janitor::ops::{clusters, invitations, projects, reaper};
use helpers::mock_atlas::{envelope, test_api};

#[tokio::test]
async fn pause_skips_clusters_that_are_already_paused() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/groups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
            json!([{"id": "p1", "name": "Analytics"}]),
            false,
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/groups/p1/clusters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
            json!([
                {"name": "active", "paused": false},
                {"name": "dormant", "paused": true},
            ]),
            false,
        )))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/groups/p1/clusters/active"))
        .and(body_partial_json(json!({"paused": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"paused": true})))
        .expect(1)
        .mount(&server)
        .await;

    let api = test_api(&server);
    let summary = clusters::pause_all_clusters(&api).await;

    assert_eq!(summary.projects_processed, 1);
    assert_eq!(summary.clusters.succeeded, 1);
    assert_eq!(summary.clusters.skipped, 1);
    assert!(summary.all_succeeded());
}

#[tokio::test]
async fn delete_all_clusters_walks_every_project() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/groups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
            json!([
                {"id": "p1", "name": "One"},
                {"id": "p2", "name": "Two"},
            ]),
            false,
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/groups/p1/clusters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
            json!([{"name": "c1", "paused": false}]),
            false,
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/groups/p2/clusters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([]), false)))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/groups/p1/clusters/c1"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let api = test_api(&server);
    let summary = clusters::delete_all_clusters(&api).await;

    assert_eq!(summary.projects_processed, 2);
    assert_eq!(summary.clusters.succeeded, 1);
    assert_eq!(summary.clusters.failed, 0);
}

#[tokio::test]
async fn dry_run_reports_empty_projects_without_deleting() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/groups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
            json!([{"id": "p1", "name": "Stale"}]),
            false,
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/groups/p1/clusters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([]), false)))
        .mount(&server)
        .await;

    let api = test_api(&server);
    let summary = projects::delete_empty_projects(&api, true).await;

    assert_eq!(summary.examined, 1);
    assert_eq!(summary.empty, 1);
    assert_eq!(summary.would_delete, vec!["Stale"]);
    assert_eq!(summary.report.skipped, 1);
    assert_eq!(summary.report.succeeded, 0);
}

#[tokio::test]
async fn empty_projects_are_deleted_when_not_dry_run() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/groups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
            json!([
                {"id": "p1", "name": "Stale"},
                {"id": "p2", "name": "Busy"},
            ]),
            false,
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/groups/p1/clusters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([]), false)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/groups/p2/clusters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
            json!([{"name": "c1", "paused": false}]),
            false,
        )))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/groups/p1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let api = test_api(&server);
    let summary = projects::delete_empty_projects(&api, false).await;

    assert_eq!(summary.examined, 2);
    assert_eq!(summary.empty, 1);
    assert!(summary.would_delete.is_empty());
    assert_eq!(summary.report.succeeded, 1);
    assert!(summary.report.all_succeeded());
}

#[tokio::test]
async fn invite_batch_accounts_valid_pending_and_malformed_addresses() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/orgs/org-1/invites"))
        .and(body_partial_json(json!({"username": "alice@example.com"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "inv-1"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/orgs/org-1/invites"))
        .and(body_partial_json(json!({"username": "bob@example.com"})))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": 409,
            "errorCode": "USER_ALREADY_EXISTS",
            "detail": "Invitation already pending",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = test_api(&server);
    let report = invitations::invite_users(
        &api,
        vec![
            "alice@example.com".to_string(),
            "bob@example.com".to_string(),
            "not-an-email".to_string(),
        ],
    )
    .await;

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.failures[0].item_id, "not-an-email");
    assert_eq!(report.failures[0].reason, "invalid email format");
}

#[tokio::test]
async fn reaper_cleans_aged_project_but_spares_protected_users() {
    let server = MockServer::start().await;
    let now = Utc::now();
    let created = (now - Duration::days(100)).to_rfc3339();

    Mock::given(method("GET"))
        .and(path("/groups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
            json!([{"id": "p1", "name": "Aged", "created": created}]),
            false,
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/groups/p1/databaseUsers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
            json!([
                {"username": "admin", "databaseName": "admin"},
                {"username": "__onprem_monitoring", "databaseName": "admin"},
                {"username": "appuser", "databaseName": "admin"},
            ]),
            false,
        )))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/groups/p1/databaseUsers/admin/appuser"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/groups/p1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
            json!([{"id": "u1", "username": "someone@example.com"}]),
            false,
        )))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/groups/p1/users/u1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/orgs/org-1/invites"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "inv-1"}])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/orgs/org-1/invites/inv-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let api = test_api(&server);
    let summary =
        reaper::reap_aged_projects(&api, &reaper::ReaperThresholds::default(), now).await;

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.cleaned, 1);
    assert_eq!(summary.errors, 0);

    let cleanup = &summary.projects[0];
    assert_eq!(cleanup.database_users.succeeded, 1);
    assert_eq!(cleanup.database_users.skipped, 2);
    assert_eq!(cleanup.project_users.succeeded, 1);
    // 100 days is past the user threshold but not the cluster threshold.
    assert!(cleanup.clusters.is_none());

    let invitations = summary.invitations.as_ref().unwrap();
    assert_eq!(invitations.succeeded, 1);
    assert!(summary.all_succeeded());
}

#[tokio::test]
async fn reaper_deletes_clusters_past_the_cluster_threshold() {
    let server = MockServer::start().await;
    let now = Utc::now();
    let created = (now - Duration::days(130)).to_rfc3339();

    Mock::given(method("GET"))
        .and(path("/groups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
            json!([{"id": "p1", "name": "Ancient", "created": created}]),
            false,
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/groups/p1/databaseUsers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([]), false)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/groups/p1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([]), false)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/groups/p1/clusters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
            json!([{"name": "c1", "paused": false}]),
            false,
        )))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/groups/p1/clusters/c1"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/orgs/org-1/invites"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let api = test_api(&server);
    let summary =
        reaper::reap_aged_projects(&api, &reaper::ReaperThresholds::default(), now).await;

    let cleanup = &summary.projects[0];
    assert!(cleanup.age_days >= 130);
    let cluster_report = cleanup.clusters.as_ref().unwrap();
    assert_eq!(cluster_report.succeeded, 1);
}

#[tokio::test]
async fn reaper_cleans_project_hours_past_the_user_threshold() {
    let server = MockServer::start().await;
    let now = Utc::now();
    // 90 whole days plus a few hours: past the threshold despite rounding
    // down to 90 days.
    let created = (now - Duration::days(90) - Duration::hours(6)).to_rfc3339();

    Mock::given(method("GET"))
        .and(path("/groups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
            json!([{"id": "p1", "name": "Borderline", "created": created}]),
            false,
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/groups/p1/databaseUsers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([]), false)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/groups/p1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([]), false)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/orgs/org-1/invites"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let api = test_api(&server);
    let summary =
        reaper::reap_aged_projects(&api, &reaper::ReaperThresholds::default(), now).await;

    assert_eq!(summary.cleaned, 1);
    assert_eq!(summary.projects[0].age_days, 90);
    assert!(summary.projects[0].clusters.is_none());
}

#[tokio::test]
async fn reaper_skips_projects_with_unparsable_creation_dates() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/groups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
            json!([
                {"id": "p1", "name": "NoDate"},
                {"id": "p2", "name": "BadDate", "created": "last tuesday"},
            ]),
            false,
        )))
        .mount(&server)
        .await;

    let api = test_api(&server);
    let summary =
        reaper::reap_aged_projects(&api, &reaper::ReaperThresholds::default(), Utc::now()).await;

    assert_eq!(summary.processed, 0);
    assert_eq!(summary.errors, 2);
    assert_eq!(summary.cleaned, 0);
    assert!(summary.invitations.is_none());
}

#[tokio::test]
async fn reaper_leaves_young_projects_alone() {
    let server = MockServer::start().await;
    let now = Utc::now();
    let created = (now - Duration::days(10)).to_rfc3339();

    Mock::given(method("GET"))
        .and(path("/groups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
            json!([{"id": "p1", "name": "Fresh", "created": created}]),
            false,
        )))
        .mount(&server)
        .await;

    let api = test_api(&server);
    let summary =
        reaper::reap_aged_projects(&api, &reaper::ReaperThresholds::default(), now).await;

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.cleaned, 0);
    assert!(summary.projects.is_empty());
    assert!(summary.invitations.is_none());
}
