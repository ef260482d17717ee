//! Batched appends into the log ledger.
//!
//! Every flush also refreshes the owning item's heartbeat, so a steady
//! stream of output doubles as a liveness signal.

use gantry_core::keys::WorkItemKey;
use gantry_core::ports::LogLedger;
use gantry_core::work::LogLine;
use gantry_core::Result;
use std::sync::Arc;

pub struct LedgerWriter {
    ledger: Arc<dyn LogLedger>,
    key: WorkItemKey,
    worker: String,
    buffer: Vec<LogLine>,
    batch_size: usize,
}

impl LedgerWriter {
    pub fn new(
        ledger: Arc<dyn LogLedger>,
        key: WorkItemKey,
        worker: impl Into<String>,
        batch_size: usize,
    ) -> Self {
        Self {
            ledger,
            key,
            worker: worker.into(),
            buffer: Vec::with_capacity(batch_size),
            batch_size: batch_size.max(1),
        }
    }

    /// Buffer one line, flushing when the batch fills.
    pub async fn push(&mut self, line: LogLine) -> Result<()> {
        self.buffer.push(line);
        if self.buffer.len() >= self.batch_size {
            self.flush().await?;
        }
        Ok(())
    }

    /// Append everything buffered so far. A no-op on an empty buffer.
    pub async fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.ledger
            .append(&self.key, &self.worker, &self.buffer)
            .await?;
        self.buffer.clear();
        Ok(())
    }
}
