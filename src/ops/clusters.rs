//! Organization-wide cluster fleet operations: delete everything, or pause
//! everything that is still running.

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::api::AtlasApi;
use crate::batch::{run_batch, MutationReport};

/// One cluster addressed by its project and name.
#[derive(Debug, Clone)]
pub struct ClusterRef {
    pub project_id: String,
    pub project_name: String,
    pub cluster_name: String,
    pub paused: bool,
}

impl ClusterRef {
    fn batch_id(&self) -> String {
        format!("{}/{}", self.project_name, self.cluster_name)
    }
}

/// Result of a fleet-wide cluster operation.
#[derive(Debug, Default, Serialize)]
pub struct FleetSummary {
    /// Projects whose cluster list was walked.
    pub projects_processed: usize,
    /// Projects skipped because the listing lacked a usable id.
    pub projects_skipped: usize,
    /// Per-cluster mutation accounting.
    pub clusters: MutationReport,
}

impl FleetSummary {
    /// Whether every cluster mutation succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.clusters.all_succeeded()
    }
}

/// Delete every cluster in every project of the organization.
pub async fn delete_all_clusters(api: &AtlasApi) -> FleetSummary {
    let (targets, processed, skipped) = collect_clusters(api).await;
    info!(
        clusters = targets.len(),
        projects = processed,
        "Deleting all clusters in organization"
    );

    let report = run_batch(
        targets,
        |_| false,
        ClusterRef::batch_id,
        |target| async move {
            api.delete_cluster(&target.project_id, &target.cluster_name)
                .await
        },
    )
    .await;

    FleetSummary {
        projects_processed: processed,
        projects_skipped: skipped,
        clusters: report,
    }
}

/// Pause every running cluster in every project of the organization.
///
/// Clusters already paused are counted as skipped, not re-patched.
pub async fn pause_all_clusters(api: &AtlasApi) -> FleetSummary {
    let (targets, processed, skipped) = collect_clusters(api).await;
    info!(
        clusters = targets.len(),
        projects = processed,
        "Pausing all clusters in organization"
    );

    let report = run_batch(
        targets,
        |target| target.paused,
        ClusterRef::batch_id,
        |target| async move {
            api.pause_cluster(&target.project_id, &target.cluster_name)
                .await
        },
    )
    .await;

    FleetSummary {
        projects_processed: processed,
        projects_skipped: skipped,
        clusters: report,
    }
}

/// Walk every project and flatten its clusters into one target list.
async fn collect_clusters(api: &AtlasApi) -> (Vec<ClusterRef>, usize, usize) {
    let projects = api.list_projects().await;
    let mut targets = Vec::new();
    let mut processed = 0;
    let mut skipped = 0;

    for project in &projects {
        let project_name = project
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("Unknown");
        let Some(project_id) = project.get("id").and_then(Value::as_str) else {
            warn!(project_name = %project_name, "Skipping project with missing id");
            skipped += 1;
            continue;
        };
        processed += 1;

        let clusters = api.list_clusters(project_id).await;
        for cluster in &clusters {
            let Some(cluster_name) = cluster.get("name").and_then(Value::as_str) else {
                warn!(
                    project_name = %project_name,
                    "Skipping cluster with missing name"
                );
                continue;
            };
            targets.push(ClusterRef {
                project_id: project_id.to_string(),
                project_name: project_name.to_string(),
                cluster_name: cluster_name.to_string(),
                paused: cluster
                    .get("paused")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            });
        }
    }

    (targets, processed, skipped)
}
