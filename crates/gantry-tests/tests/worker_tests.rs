//! Worker loop behavior against in-memory ports.

use async_trait::async_trait;
use gantry_core::keys::{Attempt, PatchsetRef, WorkItemKey};
use gantry_core::ports::{CheckoutOutcome, CheckoutRequest, CheckoutService, LogLedger, WorkQueue};
use gantry_core::work::LogLine;
use gantry_core::{Error, Result};
use gantry_tests::{MemoryLedger, MemoryWorkQueue};
use gantry_worker::{Worker, WorkerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

struct FakeCheckout {
    lines: Vec<String>,
    conflict: bool,
    fail: bool,
}

impl FakeCheckout {
    fn ok(lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|s| s.to_string()).collect(),
            conflict: false,
            fail: false,
        }
    }
}

#[async_trait]
impl CheckoutService for FakeCheckout {
    async fn checkout(
        &self,
        request: &CheckoutRequest,
        output: mpsc::Sender<LogLine>,
    ) -> Result<CheckoutOutcome> {
        for line in &self.lines {
            let _ = output.send(LogLine::now(line.clone())).await;
        }
        if self.fail {
            return Err(Error::Checkout("tooling exited with 1".to_string()));
        }
        Ok(CheckoutOutcome {
            path: PathBuf::from(format!("/srv/git-checkouts/{}", request.project)),
            conflict: self.conflict,
        })
    }
}

fn key(attempt: u32) -> WorkItemKey {
    WorkItemKey::new(PatchsetRef::new("12345", 2), "job", Attempt::new(attempt))
}

fn worker(
    queue: Arc<MemoryWorkQueue>,
    ledger: Arc<MemoryLedger>,
    checkout: FakeCheckout,
) -> Worker {
    let config = WorkerConfig {
        name: "worker-1".to_string(),
        log_batch_size: 2,
        ..WorkerConfig::default()
    };
    Worker::new(config, queue, ledger, Arc::new(checkout))
}

#[tokio::test]
async fn test_run_once_streams_output_and_completes() {
    let queue = Arc::new(MemoryWorkQueue::new());
    let ledger = Arc::new(MemoryLedger::new());
    queue.enqueue(&key(0), false).await.unwrap();

    let worker = worker(queue.clone(), ledger.clone(), FakeCheckout::ok(&["one", "two", "three"]));
    let ran = worker.run_once().await.unwrap();

    assert_eq!(ran, Some(key(0)));
    let entries = ledger.entries(&key(0)).await.unwrap();
    let texts: Vec<_> = entries.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["one", "two", "three"]);
    assert!(entries.iter().all(|e| e.worker == "worker-1"));
    assert!(queue.get(&key(0)).await.unwrap().unwrap().is_complete());
}

#[tokio::test]
async fn test_run_once_without_work_is_none() {
    let queue = Arc::new(MemoryWorkQueue::new());
    let ledger = Arc::new(MemoryLedger::new());

    let worker = worker(queue, ledger, FakeCheckout::ok(&[]));
    assert_eq!(worker.run_once().await.unwrap(), None);
}

#[tokio::test]
async fn test_retry_attempt_starts_from_cleared_ledger() {
    let queue = Arc::new(MemoryWorkQueue::new());
    let ledger = Arc::new(MemoryLedger::new());
    queue.enqueue(&key(1), false).await.unwrap();
    ledger
        .append(&key(1), "worker-0", &[LogLine::now("stale output")])
        .await
        .unwrap();

    let worker = worker(queue, ledger.clone(), FakeCheckout::ok(&["fresh output"]));
    worker.run_once().await.unwrap();

    let texts: Vec<_> = ledger
        .entries(&key(1))
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.text)
        .collect();
    assert_eq!(texts, vec!["fresh output"]);
}

#[tokio::test]
async fn test_conflict_is_recorded_in_the_log() {
    let queue = Arc::new(MemoryWorkQueue::new());
    let ledger = Arc::new(MemoryLedger::new());
    queue.enqueue(&key(0), false).await.unwrap();

    let checkout = FakeCheckout {
        lines: vec!["CONFLICT (content): merge conflict in db/api.py".to_string()],
        conflict: true,
        fail: false,
    };
    let worker = worker(queue.clone(), ledger.clone(), checkout);
    worker.run_once().await.unwrap();

    let texts: Vec<_> = ledger
        .entries(&key(0))
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.text)
        .collect();
    assert!(texts.contains(&"Checkout reported a merge conflict".to_string()));
    assert!(queue.get(&key(0)).await.unwrap().unwrap().is_complete());
}

#[tokio::test]
async fn test_failed_checkout_leaves_item_incomplete() {
    let queue = Arc::new(MemoryWorkQueue::new());
    let ledger = Arc::new(MemoryLedger::new());
    queue.enqueue(&key(0), false).await.unwrap();

    let checkout = FakeCheckout {
        lines: vec!["fatal: unable to reach gerrit".to_string()],
        conflict: false,
        fail: true,
    };
    let worker = worker(queue.clone(), ledger.clone(), checkout);
    assert!(worker.run_once().await.is_err());

    // The failure itself lands in the ledger for the report to show.
    let texts: Vec<_> = ledger
        .entries(&key(0))
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.text)
        .collect();
    assert!(texts.iter().any(|t| t.starts_with("Checkout failed:")));
    assert!(!queue.get(&key(0)).await.unwrap().unwrap().is_complete());
}
