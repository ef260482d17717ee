//! Claiming semantics over the in-memory work queue.

use gantry_core::keys::{Attempt, PatchsetRef, WorkItemKey};
use gantry_core::ports::WorkQueue;
use gantry_tests::MemoryWorkQueue;
use std::collections::HashSet;
use std::sync::Arc;

fn key(change: &str, job: &str, attempt: u32) -> WorkItemKey {
    WorkItemKey::new(PatchsetRef::new(change, 1), job, Attempt::new(attempt))
}

#[tokio::test]
async fn test_concurrent_claims_one_winner_per_item() {
    let queue = Arc::new(MemoryWorkQueue::new());
    for i in 0..5 {
        queue.enqueue(&key("I1", &format!("job-{}", i), 0), false).await.unwrap();
    }

    let mut handles = Vec::new();
    for w in 0..20 {
        let queue = queue.clone();
        handles.push(tokio::spawn(async move {
            queue.claim(&format!("worker-{}", w)).await.unwrap()
        }));
    }

    let mut won = Vec::new();
    for handle in handles {
        if let Some(item) = handle.await.unwrap() {
            won.push(item);
        }
    }

    assert_eq!(won.len(), 5);
    let distinct: HashSet<_> = won.iter().map(|i| i.key.clone()).collect();
    assert_eq!(distinct.len(), 5);
    for item in &won {
        assert!(item.is_claimed());
        assert!(item.worker.is_some());
        assert!(item.heartbeat_at.is_some());
    }
}

#[tokio::test]
async fn test_claim_on_empty_queue_is_none() {
    let queue = MemoryWorkQueue::new();
    assert!(queue.claim("worker-1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_enqueue_is_idempotent() {
    let queue = MemoryWorkQueue::new();
    queue.enqueue(&key("I1", "job", 0), false).await.unwrap();
    queue.enqueue(&key("I1", "job", 0), true).await.unwrap();

    let stats = queue.stats().await.unwrap();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.rechecks, 0);
}

#[tokio::test]
async fn test_outstanding_and_completed_for() {
    let queue = MemoryWorkQueue::new();
    let pair = PatchsetRef::new("I1", 1);
    queue.enqueue(&key("I1", "a", 0), false).await.unwrap();
    queue.enqueue(&key("I1", "b", 0), false).await.unwrap();
    queue.enqueue(&key("I2", "a", 0), false).await.unwrap();

    assert_eq!(queue.outstanding(&pair).await.unwrap(), 2);

    queue.complete(&key("I1", "a", 0)).await.unwrap();
    assert_eq!(queue.outstanding(&pair).await.unwrap(), 1);
    assert_eq!(queue.completed_for(&pair).await.unwrap().len(), 1);

    queue.complete(&key("I1", "b", 0)).await.unwrap();
    assert_eq!(queue.outstanding(&pair).await.unwrap(), 0);
    assert_eq!(queue.completed_for(&pair).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_mark_notified_drains_unnotified_pairs() {
    let queue = MemoryWorkQueue::new();
    queue.enqueue(&key("I1", "a", 0), false).await.unwrap();
    queue.complete(&key("I1", "a", 0)).await.unwrap();

    assert_eq!(queue.completed_unnotified_pairs().await.unwrap().len(), 1);

    queue.mark_notified(&key("I1", "a", 0)).await.unwrap();
    assert!(queue.completed_unnotified_pairs().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_job_names_are_distinct_and_sorted() {
    let queue = MemoryWorkQueue::new();
    queue.enqueue(&key("I1", "b", 0), false).await.unwrap();
    queue.enqueue(&key("I1", "a", 0), false).await.unwrap();
    queue.enqueue(&key("I2", "a", 0), false).await.unwrap();

    assert_eq!(queue.job_names().await.unwrap(), vec!["a", "b"]);
}
