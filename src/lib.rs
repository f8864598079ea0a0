//! Fleet hygiene toolkit for MongoDB Atlas organizations.
//!
//! Provides a digest-authenticated [`AtlasClient`] with rate-limit retries,
//! a [`PagedFetcher`] for walking paginated list endpoints, per-item batch
//! accounting via [`run_batch`] and [`MutationReport`], a JSON sidecar
//! [`OwnershipTracker`] for sandbox projects, and the [`ops`] module with
//! the hygiene operations themselves: reaping aged projects, pausing or
//! deleting the cluster fleet, sweeping empty projects, bulk-inviting users,
//! and provisioning per-user sandboxes.

pub mod api;
pub mod batch;
pub mod client;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod ops;
pub mod outcome;
pub mod retry;
pub mod tracker;

pub use api::AtlasApi;
pub use batch::{run_batch, BatchFailure, MutationReport};
pub use client::AtlasClient;
pub use config::AtlasConfig;
pub use error::{JanitorError, JanitorResult};
pub use fetcher::{PagedFetcher, PageQuery};
pub use outcome::RequestOutcome;
pub use retry::RetryPolicy;
pub use tracker::{OwnedProject, OwnershipTracker};
