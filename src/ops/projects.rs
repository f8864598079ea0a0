//! Empty-project cleanup: find projects with zero clusters and delete them,
//! or just report them in dry-run mode.

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::api::AtlasApi;
use crate::batch::{run_batch, MutationReport};

/// Result of one empty-project sweep.
#[derive(Debug, Default, Serialize)]
pub struct EmptySweepSummary {
    /// Projects examined.
    pub examined: usize,
    /// Projects found with zero clusters.
    pub empty: usize,
    /// Whether this was a dry run (nothing deleted).
    pub dry_run: bool,
    /// Names of the projects a real run would delete. Populated only in
    /// dry-run mode.
    pub would_delete: Vec<String>,
    /// Per-project deletion accounting. In dry-run mode every empty project
    /// lands in `skipped`.
    pub report: MutationReport,
}

struct EmptyProject {
    id: String,
    name: String,
}

/// Delete every project in the organization that has no clusters.
///
/// With `dry_run` set, the sweep lists what it would delete and issues no
/// deletions.
pub async fn delete_empty_projects(api: &AtlasApi, dry_run: bool) -> EmptySweepSummary {
    let projects = api.list_projects().await;
    let mut summary = EmptySweepSummary {
        dry_run,
        ..EmptySweepSummary::default()
    };
    let mut targets = Vec::new();

    for project in &projects {
        let name = project
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("Unknown");
        let Some(id) = project.get("id").and_then(Value::as_str) else {
            warn!(project_name = %name, "Skipping project with missing id");
            continue;
        };
        summary.examined += 1;

        if api.list_clusters(id).await.is_empty() {
            info!(project_name = %name, "Project has no clusters");
            targets.push(EmptyProject {
                id: id.to_string(),
                name: name.to_string(),
            });
        }
    }

    summary.empty = targets.len();
    if dry_run {
        summary.would_delete = targets.iter().map(|p| p.name.clone()).collect();
        info!(
            empty = summary.empty,
            "Dry run, not deleting empty projects"
        );
    }

    summary.report = run_batch(
        targets,
        |_| dry_run,
        |p| p.name.clone(),
        |p| async move { api.delete_project(&p.id).await },
    )
    .await;

    summary
}
