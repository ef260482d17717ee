//! Artifact publication for completed work items.

use crate::artifacts::ArtifactStore;
use crate::builder::ReportBuilder;
use gantry_core::ports::{LogLedger, MigrationCatalog, WorkQueue};
use gantry_core::Result;
use std::sync::Arc;
use tracing::{debug, info};

/// Walks completed work items and (re)publishes artifacts for any item
/// whose recorded worker marker differs from the queue row. Safe to run
/// repeatedly; an already-published item is skipped.
pub struct Publisher {
    queue: Arc<dyn WorkQueue>,
    ledger: Arc<dyn LogLedger>,
    catalog: Arc<dyn MigrationCatalog>,
    store: ArtifactStore,
}

impl Publisher {
    pub fn new(
        queue: Arc<dyn WorkQueue>,
        ledger: Arc<dyn LogLedger>,
        catalog: Arc<dyn MigrationCatalog>,
        store: ArtifactStore,
    ) -> Self {
        Self {
            queue,
            ledger,
            catalog,
            store,
        }
    }

    /// Publish every completed item that needs it. Returns how many were
    /// written.
    pub async fn publish_completed(&self) -> Result<usize> {
        let mut published = 0;
        for item in self.queue.completed().await? {
            let Some(worker) = item.worker.clone() else {
                debug!(key = %item.key, "Completed item has no worker, skipping");
                continue;
            };
            if self.store.recorded_worker(&item.key).as_deref() == Some(worker.as_str()) {
                continue;
            }

            let entries = self.ledger.entries(&item.key).await?;
            let report = ReportBuilder::new(self.catalog.as_ref())
                .build(&item.key.patchset, &entries)
                .await?;

            self.store.write(&item.key, &worker, "y", &report)?;
            info!(key = %item.key, worker = %worker, verdict = ?report.verdict, "Published report");
            published += 1;
        }
        Ok(published)
    }
}
