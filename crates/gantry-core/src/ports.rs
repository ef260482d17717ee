//! Port traits (hexagonal architecture).
//!
//! These traits define the interfaces between the core domain and external
//! adapters. All coordination between workers goes through the persistent
//! store behind [`WorkQueue`] and [`LogLedger`]; the core holds no
//! in-process shared state.

use crate::keys::{PatchsetRef, WorkItemKey};
use crate::work::{LogEntry, LogLine, QueueStats, WorkItem};
use crate::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// The shared work queue. Claiming is the sole mutual-exclusion point in
/// the system and must be a single atomic conditional update at the store.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Add a work item to the queue. Re-enqueueing an existing key is a no-op.
    async fn enqueue(&self, key: &WorkItemKey, recheck: bool) -> Result<()>;

    /// Atomically assign one unclaimed item to `worker`.
    ///
    /// Returns `Ok(None)` when no unclaimed item exists. That is a terminal,
    /// non-exceptional outcome; any retry or backoff loop belongs to the
    /// caller. Of N concurrent calls contending for one unclaimed item,
    /// exactly one receives it.
    async fn claim(&self, worker: &str) -> Result<Option<WorkItem>>;

    /// Fetch one work item by key.
    async fn get(&self, key: &WorkItemKey) -> Result<Option<WorkItem>>;

    /// Refresh the liveness timestamp for an item owned by `worker`.
    async fn heartbeat(&self, key: &WorkItemKey, worker: &str) -> Result<()>;

    /// Mark an item complete.
    async fn complete(&self, key: &WorkItemKey) -> Result<()>;

    /// All completed items, for artifact publication.
    async fn completed(&self) -> Result<Vec<WorkItem>>;

    /// Distinct patchsets having at least one completed-but-unnotified item.
    async fn completed_unnotified_pairs(&self) -> Result<Vec<PatchsetRef>>;

    /// Count of not-yet-complete items for a patchset.
    async fn outstanding(&self, pair: &PatchsetRef) -> Result<u64>;

    /// All completed items for a patchset.
    async fn completed_for(&self, pair: &PatchsetRef) -> Result<Vec<WorkItem>>;

    /// Set the notified flag on one row.
    async fn mark_notified(&self, key: &WorkItemKey) -> Result<()>;

    /// Distinct patchsets ordered by most recent heartbeat.
    async fn recent_pairs(&self, limit: Option<u32>) -> Result<Vec<PatchsetRef>>;

    /// Every job name the queue has seen.
    async fn job_names(&self) -> Result<Vec<String>>;

    /// Aggregate counters for the dashboard.
    async fn stats(&self) -> Result<QueueStats>;
}

/// The append-only log ledger.
#[async_trait]
pub trait LogLedger: Send + Sync {
    /// Durably append a batch of lines and refresh the owning item's
    /// heartbeat in the same unit of work. Partial application (lines
    /// without heartbeat, or the reverse) must not be observable.
    async fn append(&self, key: &WorkItemKey, worker: &str, lines: &[LogLine]) -> Result<()>;

    /// Delete all prior lines for a work item before a retry restarts it.
    async fn clear(&self, key: &WorkItemKey) -> Result<()>;

    /// Full ledger for a work item, timestamp ascending.
    async fn entries(&self, key: &WorkItemKey) -> Result<Vec<LogEntry>>;
}

/// Read-only lookup of known schema migrations per patchset.
#[async_trait]
pub trait MigrationCatalog: Send + Sync {
    /// Human-readable name of one migration number, if known.
    async fn name_for(&self, patchset: &PatchsetRef, migration: i64) -> Result<Option<String>>;

    /// Highest known migration number for a patchset.
    async fn max_migration(&self, patchset: &PatchsetRef) -> Result<Option<i64>>;
}

/// Downstream delivery of a consolidated notification.
///
/// Delivery failure is a retryable condition, not a core error: the
/// dispatcher leaves notified flags unset and tries again on the next
/// trigger.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn send(&self, subject: &str, recipient: &str, body: &str) -> Result<()>;
}

/// A checkout request handed to external version-control tooling.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub project: String,
    pub refurl: String,
    pub rewind: bool,
}

/// Result of a checkout: where the tree landed and whether the tooling
/// reported a merge conflict.
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub path: PathBuf,
    pub conflict: bool,
}

/// Upstream collaborator performing version-control checkouts.
///
/// Line-oriented output is streamed through `output` as it is produced so
/// the worker can feed it straight into the ledger.
#[async_trait]
pub trait CheckoutService: Send + Sync {
    async fn checkout(
        &self,
        request: &CheckoutRequest,
        output: mpsc::Sender<LogLine>,
    ) -> Result<CheckoutOutcome>;
}
