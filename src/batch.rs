//! Per-item mutation accounting for batch operations.
//!
//! A batch never aborts on a per-item failure: every item lands in exactly
//! one of succeeded / failed / skipped, and the caller decides afterwards
//! whether a nonzero failure count warrants a nonzero exit status.

use serde::Serialize;
use std::future::Future;
use tracing::{debug, info};

use crate::outcome::RequestOutcome;

/// One item that could not be mutated.
#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    /// Identifier the caller supplied for the item.
    pub item_id: String,
    /// Why the mutation failed.
    pub reason: String,
}

/// Aggregate accounting for one batch of mutations.
///
/// Created empty at batch start, updated once per item, read-only after the
/// batch completes. Reports are never merged across batches.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MutationReport {
    /// Items whose mutation succeeded (including already-exists conflicts).
    pub succeeded: usize,
    /// Items whose mutation terminally failed.
    pub failed: usize,
    /// Items excluded by the skip predicate, never passed to the mutation.
    pub skipped: usize,
    /// Identifier and reason for every failed item, in processing order.
    pub failures: Vec<BatchFailure>,
}

impl MutationReport {
    /// Whether the whole batch succeeded (`failed == 0`).
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    /// Total number of items accounted for.
    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }

    /// Record the outcome of one item's mutation.
    ///
    /// `Success` and `AlreadyExists` count as succeeded; rate-limit
    /// exhaustion and terminal failures count as failed with a reason.
    pub fn record(&mut self, item_id: &str, outcome: &RequestOutcome) {
        if outcome.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
            self.failures.push(BatchFailure {
                item_id: item_id.to_string(),
                reason: outcome
                    .failure_reason()
                    .unwrap_or_else(|| "unknown failure".to_string()),
            });
        }
    }

    /// Record an item excluded by the skip predicate.
    pub fn record_skipped(&mut self) {
        self.skipped += 1;
    }
}

/// Run `mutate` over every item, accounting each into a [`MutationReport`].
///
/// Items for which `skip` returns true are counted as skipped and never
/// mutated. Execution is sequential; one mutation in flight at a time.
pub async fn run_batch<T, S, I, M, Fut>(
    items: Vec<T>,
    skip: S,
    item_id: I,
    mut mutate: M,
) -> MutationReport
where
    S: Fn(&T) -> bool,
    I: Fn(&T) -> String,
    M: FnMut(T) -> Fut,
    Fut: Future<Output = RequestOutcome>,
{
    let mut report = MutationReport::default();

    for item in items {
        let id = item_id(&item);
        if skip(&item) {
            debug!(item = %id, "Item excluded by predicate, skipping");
            report.record_skipped();
            continue;
        }
        let outcome = mutate(item).await;
        report.record(&id, &outcome);
    }

    info!(
        succeeded = report.succeeded,
        failed = report.failed,
        skipped = report.skipped,
        "Batch complete"
    );
    report
}
