//! Typed surface over the Atlas Admin API endpoints the janitor operations
//! use: projects (groups), clusters, database users, project users, and
//! organization invitations.
//!
//! List calls go through the paginated fetcher and return raw JSON items;
//! callers extract the fields they need. Mutations return a classified
//! [`RequestOutcome`] and are rate-limit retried.

use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::client::AtlasClient;
use crate::config::AtlasConfig;
use crate::error::{JanitorError, JanitorResult};
use crate::fetcher::{PagedFetcher, PageQuery};
use crate::outcome::RequestOutcome;

/// Project role granted to sandbox owners.
pub const PROJECT_OWNER_ROLE: &str = "GROUP_OWNER";

/// Organization role granted to invited users.
pub const ORG_INVITE_ROLE: &str = "ORG_GROUP_CREATOR";

/// Atlas Admin API bound to one organization.
#[derive(Debug, Clone)]
pub struct AtlasApi {
    client: AtlasClient,
    org_id: String,
    page_query: PageQuery,
}

impl AtlasApi {
    /// Wrap an existing client for the given organization.
    #[must_use]
    pub fn new(client: AtlasClient, org_id: impl Into<String>) -> Self {
        Self {
            client,
            org_id: org_id.into(),
            page_query: PageQuery::default(),
        }
    }

    /// Build a client from configuration and wrap it.
    ///
    /// # Errors
    ///
    /// Fails fast on invalid configuration; no network call is made.
    pub fn from_config(config: &AtlasConfig) -> JanitorResult<Self> {
        let client = AtlasClient::new(config)?;
        Ok(Self::new(client, config.org_id.clone()))
    }

    /// Override pagination parameters for list calls.
    #[must_use]
    pub fn with_page_query(mut self, page_query: PageQuery) -> Self {
        self.page_query = page_query;
        self
    }

    /// The underlying HTTP client.
    #[must_use]
    pub fn client(&self) -> &AtlasClient {
        &self.client
    }

    /// The organization these operations act on.
    #[must_use]
    pub fn org_id(&self) -> &str {
        &self.org_id
    }

    /// Verify the credentials by listing accessible organizations and
    /// checking the configured org id is among them.
    ///
    /// # Errors
    ///
    /// Returns [`JanitorError::InvalidConfig`] if authentication fails or
    /// the organization is not accessible with these credentials.
    pub async fn verify_credentials(&self) -> JanitorResult<()> {
        let outcome = self
            .client
            .execute_with_retry(Method::GET, "/orgs", None)
            .await;

        let payload = match &outcome {
            RequestOutcome::Success(Some(payload)) => payload,
            _ => {
                return Err(JanitorError::invalid_config(format!(
                    "failed to authenticate with the Atlas API: {}",
                    outcome
                        .failure_reason()
                        .unwrap_or_else(|| "empty response".to_string())
                )))
            }
        };

        let accessible: Vec<&str> = payload["results"]
            .as_array()
            .map(|orgs| {
                orgs.iter()
                    .filter_map(|org| org.get("id").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default();

        if !accessible.contains(&self.org_id.as_str()) {
            return Err(JanitorError::invalid_config(format!(
                "organization {} not found among accessible organizations {:?}",
                self.org_id, accessible
            )));
        }

        info!(org_id = %self.org_id, "Atlas API credentials verified");
        Ok(())
    }

    // ── List endpoints (paginated, best-effort) ───────────────────────

    /// All projects in the organization.
    pub async fn list_projects(&self) -> Vec<Value> {
        let path = format!("/groups?orgId={}", self.org_id);
        let projects = self.fetcher().fetch_all(&path, &self.page_query).await;
        info!(count = projects.len(), "Fetched projects");
        projects
    }

    /// All clusters in a project.
    pub async fn list_clusters(&self, project_id: &str) -> Vec<Value> {
        let path = format!("/groups/{project_id}/clusters");
        self.fetcher().fetch_all(&path, &self.page_query).await
    }

    /// All database users in a project.
    pub async fn list_database_users(&self, project_id: &str) -> Vec<Value> {
        let path = format!("/groups/{project_id}/databaseUsers");
        self.fetcher().fetch_all(&path, &self.page_query).await
    }

    /// All Atlas users with access to a project.
    pub async fn list_project_users(&self, project_id: &str) -> Vec<Value> {
        let path = format!("/groups/{project_id}/users");
        self.fetcher().fetch_all(&path, &self.page_query).await
    }

    /// All pending organization invitations.
    ///
    /// Older deployments expose `/invites`, newer ones `/invitations`; the
    /// first endpoint that answers with a list-shaped payload wins. Either
    /// an envelope or a bare array is accepted.
    pub async fn list_org_invitations(&self) -> Vec<Value> {
        for resource in ["invites", "invitations"] {
            let path = format!("/orgs/{}/{}", self.org_id, resource);
            let outcome = self.client.execute_with_retry(Method::GET, &path, None).await;
            let Some(payload) = outcome.payload() else {
                debug!(path = %path, "Invitation endpoint did not answer, trying next");
                continue;
            };
            let invitations = match payload {
                Value::Array(list) => list.clone(),
                Value::Object(envelope) => envelope
                    .get("results")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default(),
                _ => continue,
            };
            info!(count = invitations.len(), "Fetched organization invitations");
            return invitations;
        }
        Vec::new()
    }

    // ── Mutations ─────────────────────────────────────────────────────

    /// Create a project owned (by tag) by `owner_email`.
    pub async fn create_project(&self, name: &str, owner_email: &str) -> RequestOutcome {
        let body = json!({
            "name": name,
            "orgId": self.org_id,
            "tags": [{"key": "owner", "value": owner_email}],
        });
        self.client
            .execute_with_retry(Method::POST, "/groups", Some(&body))
            .await
    }

    /// Delete a project.
    pub async fn delete_project(&self, project_id: &str) -> RequestOutcome {
        let path = format!("/groups/{project_id}");
        self.client
            .execute_with_retry(Method::DELETE, &path, None)
            .await
    }

    /// Create a free-tier (M0) replica set cluster in a project.
    pub async fn create_cluster(
        &self,
        project_id: &str,
        name: &str,
        owner_email: &str,
    ) -> RequestOutcome {
        let body = json!({
            "clusterType": "REPLICASET",
            "name": name,
            "replicaSetScalingStrategy": "WORKLOAD_TYPE",
            "replicationSpecs": [{
                "regionConfigs": [{
                    "electableSpecs": {
                        "diskIOPS": 0,
                        "ebsVolumeType": "STANDARD",
                        "instanceSize": "M0",
                        "nodeCount": 1,
                    },
                    "priority": 7,
                    "providerName": "TENANT",
                    "backingProviderName": "AWS",
                    "regionName": "US_EAST_1",
                }],
            }],
            "tags": [{"key": "owner", "value": owner_email}],
        });
        let path = format!("/groups/{project_id}/clusters");
        self.client
            .execute_with_retry(Method::POST, &path, Some(&body))
            .await
    }

    /// Delete a cluster.
    pub async fn delete_cluster(&self, project_id: &str, cluster_name: &str) -> RequestOutcome {
        let path = format!("/groups/{project_id}/clusters/{cluster_name}");
        self.client
            .execute_with_retry(Method::DELETE, &path, None)
            .await
    }

    /// Pause a cluster (PATCH `{"paused": true}`).
    pub async fn pause_cluster(&self, project_id: &str, cluster_name: &str) -> RequestOutcome {
        let body = json!({"paused": true});
        let path = format!("/groups/{project_id}/clusters/{cluster_name}");
        self.client
            .execute_with_retry(Method::PATCH, &path, Some(&body))
            .await
    }

    /// Delete a database user from a project.
    pub async fn delete_database_user(
        &self,
        project_id: &str,
        database_name: &str,
        username: &str,
    ) -> RequestOutcome {
        let path = format!("/groups/{project_id}/databaseUsers/{database_name}/{username}");
        self.client
            .execute_with_retry(Method::DELETE, &path, None)
            .await
    }

    /// Remove an Atlas user's access to a project.
    pub async fn remove_project_user(&self, project_id: &str, user_id: &str) -> RequestOutcome {
        let path = format!("/groups/{project_id}/users/{user_id}");
        self.client
            .execute_with_retry(Method::DELETE, &path, None)
            .await
    }

    /// Invite a user to the organization with the given role.
    pub async fn invite_to_org(&self, email: &str, role: &str) -> RequestOutcome {
        let body = json!({"roles": [role], "username": email});
        let path = format!("/orgs/{}/invites", self.org_id);
        self.client
            .execute_with_retry(Method::POST, &path, Some(&body))
            .await
    }

    /// Invite a user to a project with the given role.
    pub async fn invite_to_project(
        &self,
        project_id: &str,
        email: &str,
        role: &str,
    ) -> RequestOutcome {
        let body = json!({"roles": [role], "username": email});
        let path = format!("/groups/{project_id}/invites");
        self.client
            .execute_with_retry(Method::POST, &path, Some(&body))
            .await
    }

    /// Delete a pending organization invitation, trying both endpoint
    /// spellings.
    pub async fn delete_org_invitation(&self, invitation_id: &str) -> RequestOutcome {
        let mut last = RequestOutcome::transport_failure("no invitation endpoint answered");
        for resource in ["invites", "invitations"] {
            let path = format!("/orgs/{}/{}/{}", self.org_id, resource, invitation_id);
            let outcome = self
                .client
                .execute_with_retry(Method::DELETE, &path, None)
                .await;
            if outcome.is_success() {
                return outcome;
            }
            last = outcome;
        }
        last
    }

    fn fetcher(&self) -> PagedFetcher<'_> {
        PagedFetcher::new(&self.client)
    }
}
