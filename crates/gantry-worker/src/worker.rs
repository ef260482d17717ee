//! The claim-and-run loop.

use crate::config::WorkerConfig;
use crate::writer::LedgerWriter;
use gantry_core::keys::{Attempt, PatchsetRef, WorkItemKey};
use gantry_core::ports::{CheckoutRequest, CheckoutService, LogLedger, WorkQueue};
use gantry_core::work::LogLine;
use gantry_core::{Error, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Gerrit-style ref for a patchset.
pub fn refurl_for(patchset: &PatchsetRef) -> String {
    format!("refs/changes/{}/{}", patchset.change, patchset.revision)
}

pub struct Worker {
    config: WorkerConfig,
    queue: Arc<dyn WorkQueue>,
    ledger: Arc<dyn LogLedger>,
    checkout: Arc<dyn CheckoutService>,
}

impl Worker {
    pub fn new(
        config: WorkerConfig,
        queue: Arc<dyn WorkQueue>,
        ledger: Arc<dyn LogLedger>,
        checkout: Arc<dyn CheckoutService>,
    ) -> Self {
        Self {
            config,
            queue,
            ledger,
            checkout,
        }
    }

    /// Claim and run at most one work item. Returns the key of the item that
    /// ran, or `None` when the queue had nothing unclaimed. Polling and
    /// backoff belong to the caller.
    pub async fn run_once(&self) -> Result<Option<WorkItemKey>> {
        let Some(item) = self.queue.claim(&self.config.name).await? else {
            debug!(worker = %self.config.name, "No unclaimed work");
            return Ok(None);
        };
        info!(worker = %self.config.name, key = %item.key, "Claimed work item");

        // A retry starts from a clean ledger.
        if item.key.attempt > Attempt::FIRST {
            self.ledger.clear(&item.key).await?;
        }

        let request = CheckoutRequest {
            project: self.config.project.clone(),
            refurl: refurl_for(&item.key.patchset),
            rewind: item.recheck,
        };

        let (tx, mut rx) = mpsc::channel::<LogLine>(64);
        let checkout = self.checkout.clone();
        let handle = tokio::spawn(async move { checkout.checkout(&request, tx).await });

        let mut writer = LedgerWriter::new(
            self.ledger.clone(),
            item.key.clone(),
            &self.config.name,
            self.config.log_batch_size,
        );
        while let Some(line) = rx.recv().await {
            writer.push(line).await?;
        }

        let outcome = handle
            .await
            .map_err(|e| Error::Internal(format!("checkout task panicked: {}", e)))?;

        match outcome {
            Ok(outcome) => {
                if outcome.conflict {
                    warn!(key = %item.key, "Checkout reported a merge conflict");
                    writer
                        .push(LogLine::now("Checkout reported a merge conflict"))
                        .await?;
                }
                writer.flush().await?;
            }
            Err(e) => {
                writer.push(LogLine::now(format!("Checkout failed: {}", e))).await?;
                writer.flush().await?;
                return Err(e);
            }
        }

        self.queue.complete(&item.key).await?;
        info!(key = %item.key, "Work item complete");
        Ok(Some(item.key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refurl_for() {
        assert_eq!(refurl_for(&PatchsetRef::new("12345", 2)), "refs/changes/12345/2");
    }
}
