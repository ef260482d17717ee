//! Work queue and log ledger types.

use crate::keys::{ClaimToken, WorkItemKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One unit of CI work: a (patchset, job, attempt) queue row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    pub key: WorkItemKey,
    pub worker: Option<String>,
    pub claim_token: Option<ClaimToken>,
    pub completed_at: Option<DateTime<Utc>>,
    pub heartbeat_at: Option<DateTime<Utc>>,
    pub notified: bool,
    pub recheck: bool,
}

impl WorkItem {
    pub fn is_claimed(&self) -> bool {
        self.claim_token.is_some()
    }

    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// A timestamped line of output, not yet attached to a work item.
///
/// Checkout adapters and workers produce these; the ledger attaches the
/// owning key and worker when a batch is appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLine {
    pub timestamp: DateTime<Utc>,
    pub text: String,
}

impl LogLine {
    pub fn now(text: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            text: text.into(),
        }
    }
}

/// A persisted ledger row for one work item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub worker: String,
    pub timestamp: DateTime<Utc>,
    pub text: String,
}

/// Aggregate queue counters for the dashboard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueStats {
    pub total: u64,
    pub rechecks: u64,
    pub completed: u64,
    pub queued: u64,
    pub latest_heartbeat: Option<DateTime<Utc>>,
}
