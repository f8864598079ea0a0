//! Fleet hygiene operations built on the paginated-fetch and batch-mutation
//! core: aged-project reaping, cluster fleet pause/delete, empty-project
//! cleanup, bulk invitations, and sandbox provisioning.

pub mod clusters;
pub mod invitations;
pub mod projects;
pub mod provisioner;
pub mod reaper;
