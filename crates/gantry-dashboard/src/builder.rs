//! Dashboard assembly from queue state and published artifacts.

use chrono::{DateTime, Utc};
use gantry_core::keys::{Attempt, PatchsetRef, WorkItemKey};
use gantry_core::ports::WorkQueue;
use gantry_core::work::QueueStats;
use gantry_core::Result;
use gantry_report::ArtifactStore;
use std::sync::Arc;
use tracing::debug;

/// Outcome shown in one dashboard cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellStatus {
    Passed,
    Failed(String),
    /// Artifacts exist but the report has not been published yet.
    Pending,
}

/// One job's latest run for a patchset.
#[derive(Debug, Clone)]
pub struct Cell {
    pub attempt: Attempt,
    pub status: CellStatus,
    pub log_url: String,
    /// Upgrade phases in encounter order, as (name, elapsed display).
    pub phases: Vec<(String, String)>,
    pub final_schema_version: Option<i64>,
    pub expected_final_schema_version: Option<i64>,
    pub heartbeat_at: Option<DateTime<Utc>>,
    /// Earlier attempts, oldest first, as (attempt, log url).
    pub alternates: Vec<(Attempt, String)>,
}

/// One patchset row. `cells` is aligned with the dashboard's job list; a
/// job that never ran for this patchset holds `None`.
#[derive(Debug, Clone)]
pub struct Row {
    pub patchset: PatchsetRef,
    pub cells: Vec<Option<Cell>>,
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub generated_at: DateTime<Utc>,
    pub stats: QueueStats,
    pub jobs: Vec<String>,
    pub rows: Vec<Row>,
}

pub struct DashboardBuilder {
    queue: Arc<dyn WorkQueue>,
    store: ArtifactStore,
    base_url: String,
}

impl DashboardBuilder {
    pub fn new(queue: Arc<dyn WorkQueue>, store: ArtifactStore, base_url: impl Into<String>) -> Self {
        Self {
            queue,
            store,
            base_url: base_url.into(),
        }
    }

    /// Assemble the dashboard for up to `limit` recent patchsets, newest
    /// first. `None` means all of them.
    pub async fn build(&self, limit: Option<u32>) -> Result<Dashboard> {
        let stats = self.queue.stats().await?;
        let mut jobs = self.queue.job_names().await?;
        jobs.sort();

        let pairs = self.queue.recent_pairs(limit).await?;
        debug!(pairs = pairs.len(), jobs = jobs.len(), "Assembling dashboard");

        let mut rows = Vec::with_capacity(pairs.len());
        for patchset in pairs {
            let mut cells = Vec::with_capacity(jobs.len());
            for job in &jobs {
                cells.push(self.cell_for(&patchset, job).await?);
            }
            rows.push(Row { patchset, cells });
        }

        Ok(Dashboard {
            generated_at: Utc::now(),
            stats,
            jobs,
            rows,
        })
    }

    async fn cell_for(&self, patchset: &PatchsetRef, job: &str) -> Result<Option<Cell>> {
        let Some(latest) = self.store.latest_attempt(patchset, job) else {
            return Ok(None);
        };

        let key = WorkItemKey::new(patchset.clone(), job, latest);
        let (status, phases, final_schema_version, expected_final_schema_version) =
            match self.store.load_data(&key)? {
                Some(data) => {
                    let phases = data
                        .order
                        .iter()
                        .map(|name| {
                            let elapsed = data.details.get(name).cloned().unwrap_or_default();
                            (name.clone(), elapsed)
                        })
                        .collect();
                    let status = match data.result {
                        Some(reason) => CellStatus::Failed(reason),
                        None => CellStatus::Passed,
                    };
                    (
                        status,
                        phases,
                        data.final_schema_version,
                        data.expected_final_schema_version,
                    )
                }
                None => (CellStatus::Pending, Vec::new(), None, None),
            };

        let heartbeat_at = self.queue.get(&key).await?.and_then(|item| item.heartbeat_at);

        let mut alternates = Vec::new();
        let mut attempt = Attempt::FIRST;
        while attempt < latest {
            let alt = WorkItemKey::new(patchset.clone(), job, attempt);
            alternates.push((attempt, self.store.log_url(&self.base_url, &alt)));
            attempt = attempt.next();
        }

        Ok(Some(Cell {
            attempt: latest,
            status,
            log_url: self.store.log_url(&self.base_url, &key),
            phases,
            final_schema_version,
            expected_final_schema_version,
            heartbeat_at,
            alternates,
        }))
    }
}
