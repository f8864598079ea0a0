//! Sandbox provisioning: one project and one free-tier cluster per user,
//! idempotent across reruns, with ownership recorded in the sidecar store.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use tracing::{info, warn};

use crate::api::{AtlasApi, PROJECT_OWNER_ROLE};
use crate::batch::MutationReport;
use crate::outcome::RequestOutcome;
use crate::tracker::OwnershipTracker;

/// Name of the cluster created in every sandbox project.
pub const SANDBOX_CLUSTER_NAME: &str = "sandbox-cluster";

/// Canonical project name for a user's sandbox.
#[must_use]
pub fn sandbox_project_name(email: &str) -> String {
    format!("sandbox-{email}")
}

/// Creates and tears down per-user sandbox projects.
pub struct Provisioner<'a> {
    api: &'a AtlasApi,
    tracker: OwnershipTracker,
}

impl<'a> Provisioner<'a> {
    #[must_use]
    pub fn new(api: &'a AtlasApi, tracker: OwnershipTracker) -> Self {
        Self { api, tracker }
    }

    /// The ownership store, for inspection after a run.
    #[must_use]
    pub fn tracker(&self) -> &OwnershipTracker {
        &self.tracker
    }

    /// Ensure every email has a sandbox project with an owner invitation and
    /// a free-tier cluster.
    ///
    /// Duplicate emails are collapsed before provisioning. Each email is one
    /// batch item: already-provisioned users count as succeeded, and a
    /// failure at any step fails that item without aborting the rest.
    pub async fn provision(&mut self, emails: Vec<String>) -> MutationReport {
        let emails: Vec<String> = emails
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        info!(count = emails.len(), "Provisioning sandboxes");

        // One project listing up front; membership and existence checks for
        // every email reuse it instead of refetching.
        let projects = self.api.list_projects().await;
        let mut ids_by_name = BTreeMap::new();
        let mut known_ids = BTreeSet::new();
        for project in &projects {
            if let (Some(name), Some(id)) = (
                project.get("name").and_then(Value::as_str),
                project.get("id").and_then(Value::as_str),
            ) {
                ids_by_name.insert(name.to_string(), id.to_string());
                known_ids.insert(id.to_string());
            }
        }

        let mut report = MutationReport::default();
        for email in emails {
            let outcome = self.provision_one(&email, &ids_by_name, &known_ids).await;
            report.record(&email, &outcome);
        }

        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            "Provisioning complete"
        );
        report
    }

    async fn provision_one(
        &mut self,
        email: &str,
        ids_by_name: &BTreeMap<String, String>,
        known_ids: &BTreeSet<String>,
    ) -> RequestOutcome {
        let project_name = sandbox_project_name(email);

        // A tracked project that still exists is reused; a tracked project
        // that vanished (deleted out of band) is recreated.
        let tracked = self
            .tracker
            .project_id(email)
            .filter(|id| known_ids.contains(*id))
            .map(str::to_string);

        let (project_id, newly_created) = match tracked {
            Some(id) => {
                info!(email = %email, project_id = %id, "Sandbox project already tracked");
                (id, false)
            }
            None => {
                let (id, created) = match self
                    .create_sandbox_project(email, &project_name, ids_by_name)
                    .await
                {
                    Ok(created) => created,
                    Err(outcome) => return outcome,
                };
                // Record only here, so reruns over a tracked project keep
                // the original provisioning date.
                if let Err(e) = self.tracker.record(email, &id, &project_name) {
                    warn!(email = %email, error = %e, "Failed to persist ownership entry");
                }
                (id, created)
            }
        };

        self.ensure_owner_invited(email, &project_id, newly_created)
            .await;
        self.ensure_cluster(email, &project_id).await
    }

    /// Create the project, resolving the id from the listing when it already
    /// exists under its canonical name.
    async fn create_sandbox_project(
        &self,
        email: &str,
        project_name: &str,
        ids_by_name: &BTreeMap<String, String>,
    ) -> Result<(String, bool), RequestOutcome> {
        match self.api.create_project(project_name, email).await {
            RequestOutcome::Success(payload) => {
                let Some(id) = payload
                    .as_ref()
                    .and_then(|p| p.get("id"))
                    .and_then(Value::as_str)
                else {
                    return Err(RequestOutcome::Failure {
                        status: None,
                        message: "project created but response had no id".to_string(),
                    });
                };
                info!(email = %email, project_id = %id, "Created sandbox project");
                Ok((id.to_string(), true))
            }
            RequestOutcome::AlreadyExists(code) => {
                let Some(id) = ids_by_name.get(project_name) else {
                    return Err(RequestOutcome::Failure {
                        status: Some(409),
                        message: format!(
                            "project {project_name} reported as existing ({code}) but not found in listing"
                        ),
                    });
                };
                info!(email = %email, project_id = %id, "Sandbox project already exists");
                Ok((id.clone(), false))
            }
            other => Err(other),
        }
    }

    /// Invite the owner to their project. Non-fatal: membership problems are
    /// logged and the provisioning item continues.
    async fn ensure_owner_invited(&self, email: &str, project_id: &str, newly_created: bool) {
        if !newly_created {
            let members = self.api.list_project_users(project_id).await;
            let already_member = members.iter().any(|m| {
                m.get("username")
                    .or_else(|| m.get("emailAddress"))
                    .and_then(Value::as_str)
                    .is_some_and(|u| u.eq_ignore_ascii_case(email))
            });
            if already_member {
                return;
            }
        }

        let outcome = self
            .api
            .invite_to_project(project_id, email, PROJECT_OWNER_ROLE)
            .await;
        if let Some(reason) = outcome.failure_reason() {
            warn!(email = %email, reason = %reason, "Failed to invite owner to project");
        }
    }

    /// Create the sandbox cluster if the project has none yet.
    async fn ensure_cluster(&self, email: &str, project_id: &str) -> RequestOutcome {
        let clusters = self.api.list_clusters(project_id).await;
        if !clusters.is_empty() {
            info!(email = %email, "Project already has a cluster");
            return RequestOutcome::Success(None);
        }

        let outcome = self
            .api
            .create_cluster(project_id, SANDBOX_CLUSTER_NAME, email)
            .await;
        if outcome.is_success() {
            info!(email = %email, "Created sandbox cluster");
        }
        outcome
    }

    /// Delete the clusters of the tracked projects for these emails. Project
    /// entries stay in the store.
    pub async fn delete_clusters_for(&mut self, emails: Vec<String>) -> MutationReport {
        let mut report = MutationReport::default();
        for email in dedupe(emails) {
            let Some(project_id) = self.tracker.project_id(&email).map(str::to_string) else {
                warn!(email = %email, "No tracked project, skipping");
                report.record_skipped();
                continue;
            };
            let clusters = self.api.list_clusters(&project_id).await;
            if clusters.is_empty() {
                report.record(&email, &RequestOutcome::Success(None));
                continue;
            }
            for cluster in &clusters {
                let Some(name) = cluster.get("name").and_then(Value::as_str) else {
                    continue;
                };
                let outcome = self.api.delete_cluster(&project_id, name).await;
                report.record(&format!("{email}/{name}"), &outcome);
            }
        }
        report
    }

    /// Delete the tracked projects for these emails, removing each store
    /// entry once its project is gone.
    pub async fn delete_projects_for(&mut self, emails: Vec<String>) -> MutationReport {
        let mut report = MutationReport::default();
        for email in dedupe(emails) {
            let Some(project_id) = self.tracker.project_id(&email).map(str::to_string) else {
                warn!(email = %email, "No tracked project, skipping");
                report.record_skipped();
                continue;
            };
            let outcome = self.api.delete_project(&project_id).await;
            if outcome.is_success() {
                if let Err(e) = self.tracker.remove(&email) {
                    warn!(email = %email, error = %e, "Failed to drop ownership entry");
                }
            }
            report.record(&email, &outcome);
        }
        report
    }

    /// Delete the clusters of every tracked sandbox.
    pub async fn delete_all_managed_clusters(&mut self) -> MutationReport {
        let emails = self.tracker.emails();
        self.delete_clusters_for(emails).await
    }

    /// Delete every tracked sandbox project.
    pub async fn delete_all_managed_projects(&mut self) -> MutationReport {
        let emails = self.tracker.emails();
        self.delete_projects_for(emails).await
    }
}

fn dedupe(emails: Vec<String>) -> Vec<String> {
    emails
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
