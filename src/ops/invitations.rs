//! Bulk organization invitations.

use std::sync::LazyLock;

use tracing::info;

use crate::api::{AtlasApi, ORG_INVITE_ROLE};
use crate::batch::{run_batch, MutationReport};
use crate::outcome::RequestOutcome;

/// Invite every email to the organization with the default role.
pub async fn invite_users(api: &AtlasApi, emails: Vec<String>) -> MutationReport {
    invite_users_with_role(api, emails, ORG_INVITE_ROLE).await
}

/// Invite every email to the organization with an explicit role.
///
/// Addresses that fail the shape check are counted as failed without an API
/// call; an invitation already pending for an address counts as succeeded.
pub async fn invite_users_with_role(
    api: &AtlasApi,
    emails: Vec<String>,
    role: &str,
) -> MutationReport {
    info!(count = emails.len(), role = %role, "Inviting users to organization");
    run_batch(
        emails,
        |_| false,
        Clone::clone,
        |email| async move {
            if !is_valid_email(&email) {
                return RequestOutcome::Failure {
                    status: None,
                    message: "invalid email format".to_string(),
                };
            }
            api.invite_to_org(&email, role).await
        },
    )
    .await
}

/// Email shape pattern: restricted local-part charset, dotted domain, and
/// an alphabetic TLD of at least two characters.
static EMAIL_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("EMAIL_REGEX is a valid regex pattern")
});

/// Whether an address is well-formed enough to invite.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}
