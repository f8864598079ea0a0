//! Aged-project reaper: strip access and workloads from projects past their
//! age thresholds.
//!
//! Projects older than the user threshold lose their non-protected database
//! users and all project-level user access; projects older than the cluster
//! threshold additionally lose their clusters. When any project crosses the
//! user threshold, all pending organization invitations are revoked too.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::api::AtlasApi;
use crate::batch::{run_batch, MutationReport};

/// Days after which a project's users are removed.
pub const USER_DELETION_THRESHOLD_DAYS: i64 = 90;

/// Days after which a project's clusters are deleted.
pub const CLUSTER_DELETION_THRESHOLD_DAYS: i64 = 120;

/// Database users that are never deleted, whatever the project age.
pub const PROTECTED_DATABASE_USERS: &[&str] = &["__onprem_monitoring", "admin"];

/// Age thresholds for the reaper, in days.
#[derive(Debug, Clone, Copy)]
pub struct ReaperThresholds {
    pub user_deletion_days: i64,
    pub cluster_deletion_days: i64,
}

impl Default for ReaperThresholds {
    fn default() -> Self {
        Self {
            user_deletion_days: USER_DELETION_THRESHOLD_DAYS,
            cluster_deletion_days: CLUSTER_DELETION_THRESHOLD_DAYS,
        }
    }
}

/// What was cleaned in one aged project.
#[derive(Debug, Serialize)]
pub struct ProjectCleanup {
    pub project_id: String,
    pub project_name: String,
    pub age_days: i64,
    pub database_users: MutationReport,
    pub project_users: MutationReport,
    /// Present only when the project also crossed the cluster threshold.
    pub clusters: Option<MutationReport>,
}

impl ProjectCleanup {
    /// Whether every mutation in this project's cleanup succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.database_users.all_succeeded()
            && self.project_users.all_succeeded()
            && self
                .clusters
                .as_ref()
                .is_none_or(MutationReport::all_succeeded)
    }
}

/// Result of one reaper pass over the organization.
#[derive(Debug, Default, Serialize)]
pub struct ReaperSummary {
    /// Projects whose age could be determined.
    pub processed: usize,
    /// Projects that crossed the user threshold and were cleaned.
    pub cleaned: usize,
    /// Projects skipped because their creation date was missing or unparsable.
    pub errors: usize,
    /// Per-project cleanup detail.
    pub projects: Vec<ProjectCleanup>,
    /// Invitation revocations, present when any project was cleaned.
    pub invitations: Option<MutationReport>,
}

impl ReaperSummary {
    /// Whether every mutation across the whole pass succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.projects.iter().all(ProjectCleanup::all_succeeded)
            && self
                .invitations
                .as_ref()
                .is_none_or(MutationReport::all_succeeded)
    }
}

/// Clean every project older than the thresholds, measured against `now`.
pub async fn reap_aged_projects(
    api: &AtlasApi,
    thresholds: &ReaperThresholds,
    now: DateTime<Utc>,
) -> ReaperSummary {
    let projects = api.list_projects().await;
    let mut summary = ReaperSummary::default();

    for project in &projects {
        let name = project
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("Unknown");
        let Some(id) = project.get("id").and_then(Value::as_str) else {
            warn!(project_name = %name, "Skipping project with missing id");
            summary.errors += 1;
            continue;
        };
        let Some(created) = project_created(project) else {
            warn!(
                project_name = %name,
                "Skipping project with missing or unparsable creation date"
            );
            summary.errors += 1;
            continue;
        };
        summary.processed += 1;

        // Exact timestamp comparison: a project 90 days and some hours old
        // is past a 90-day threshold.
        let age = now - created;
        let age_days = age.num_days();
        if age <= Duration::days(thresholds.user_deletion_days) {
            continue;
        }
        info!(
            project_name = %name,
            age_days,
            "Project past user threshold, cleaning"
        );

        let database_users = remove_database_users(api, id).await;
        let project_users = remove_project_users(api, id).await;
        let clusters = if age > Duration::days(thresholds.cluster_deletion_days) {
            info!(
                project_name = %name,
                age_days,
                "Project past cluster threshold, deleting clusters"
            );
            Some(remove_clusters(api, id).await)
        } else {
            None
        };

        summary.cleaned += 1;
        summary.projects.push(ProjectCleanup {
            project_id: id.to_string(),
            project_name: name.to_string(),
            age_days,
            database_users,
            project_users,
            clusters,
        });
    }

    if summary.cleaned > 0 {
        summary.invitations = Some(revoke_org_invitations(api).await);
    }

    info!(
        processed = summary.processed,
        cleaned = summary.cleaned,
        errors = summary.errors,
        "Reaper pass complete"
    );
    summary
}

/// A project's creation instant, from its `created` RFC 3339 timestamp.
fn project_created(project: &Value) -> Option<DateTime<Utc>> {
    let created = project.get("created").and_then(Value::as_str)?;
    let created = DateTime::parse_from_rfc3339(created).ok()?;
    Some(created.with_timezone(&Utc))
}

struct DatabaseUserRef {
    database_name: String,
    username: String,
}

async fn remove_database_users(api: &AtlasApi, project_id: &str) -> MutationReport {
    let users = api.list_database_users(project_id).await;
    let targets: Vec<DatabaseUserRef> = users
        .iter()
        .filter_map(|user| {
            let username = user.get("username").and_then(Value::as_str)?;
            Some(DatabaseUserRef {
                database_name: user
                    .get("databaseName")
                    .and_then(Value::as_str)
                    .unwrap_or("admin")
                    .to_string(),
                username: username.to_string(),
            })
        })
        .collect();

    run_batch(
        targets,
        |u| PROTECTED_DATABASE_USERS.contains(&u.username.as_str()),
        |u| u.username.clone(),
        |u| async move {
            api.delete_database_user(project_id, &u.database_name, &u.username)
                .await
        },
    )
    .await
}

async fn remove_project_users(api: &AtlasApi, project_id: &str) -> MutationReport {
    let users = api.list_project_users(project_id).await;
    let targets: Vec<String> = users
        .iter()
        .filter_map(|user| user.get("id").and_then(Value::as_str))
        .map(str::to_string)
        .collect();

    run_batch(
        targets,
        |_| false,
        Clone::clone,
        |user_id| async move { api.remove_project_user(project_id, &user_id).await },
    )
    .await
}

async fn remove_clusters(api: &AtlasApi, project_id: &str) -> MutationReport {
    let clusters = api.list_clusters(project_id).await;
    let targets: Vec<String> = clusters
        .iter()
        .filter_map(|cluster| cluster.get("name").and_then(Value::as_str))
        .map(str::to_string)
        .collect();

    run_batch(
        targets,
        |_| false,
        Clone::clone,
        |name| async move { api.delete_cluster(project_id, &name).await },
    )
    .await
}

async fn revoke_org_invitations(api: &AtlasApi) -> MutationReport {
    let invitations = api.list_org_invitations().await;
    let targets: Vec<String> = invitations
        .iter()
        .filter_map(|inv| inv.get("id").and_then(Value::as_str))
        .map(str::to_string)
        .collect();
    info!(count = targets.len(), "Revoking pending organization invitations");

    run_batch(
        targets,
        |_| false,
        Clone::clone,
        |id| async move { api.delete_org_invitation(&id).await },
    )
    .await
}
