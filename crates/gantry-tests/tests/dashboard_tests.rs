//! Dashboard assembly over queue state and partial artifacts.

use gantry_core::keys::{Attempt, PatchsetRef, WorkItemKey};
use gantry_core::ports::WorkQueue;
use gantry_core::report::{Report, UpgradePhase, Verdict};
use gantry_dashboard::{CellStatus, DashboardBuilder};
use gantry_report::ArtifactStore;
use gantry_tests::MemoryWorkQueue;
use std::sync::Arc;
use tempfile::TempDir;

fn key(change: &str, job: &str, attempt: u32) -> WorkItemKey {
    WorkItemKey::new(PatchsetRef::new(change, 1), job, Attempt::new(attempt))
}

fn report(verdict: Option<Verdict>) -> Report {
    Report {
        phases: vec![UpgradePhase {
            name: "trunk".to_string(),
            elapsed_secs: Some(3),
        }],
        final_version: Some(152),
        expected_version: Some(152),
        verdict,
        html: "<html></html>".to_string(),
    }
}

#[tokio::test]
async fn test_rows_align_with_sorted_jobs() {
    let tmp = TempDir::new().unwrap();
    let store = ArtifactStore::new(tmp.path());
    let queue = Arc::new(MemoryWorkQueue::new());

    queue.enqueue(&key("I1", "beta", 0), false).await.unwrap();
    queue.enqueue(&key("I1", "alpha", 0), false).await.unwrap();
    queue.enqueue(&key("I1", "alpha", 1), false).await.unwrap();
    queue.enqueue(&key("I2", "beta", 0), false).await.unwrap();

    store.write(&key("I1", "alpha", 0), "w1", "y", &report(None)).unwrap();
    store
        .write(
            &key("I1", "alpha", 1),
            "w2",
            "y",
            &report(Some(Verdict::IncorrectFinalVersion)),
        )
        .unwrap();

    let builder = DashboardBuilder::new(queue, store, "http://ci/ci");
    let dashboard = builder.build(None).await.unwrap();

    assert_eq!(dashboard.jobs, vec!["alpha", "beta"]);
    assert_eq!(dashboard.rows.len(), 2);

    let row = dashboard
        .rows
        .iter()
        .find(|r| r.patchset.change == "I1")
        .unwrap();
    let alpha = row.cells[0].as_ref().unwrap();
    assert_eq!(alpha.attempt, Attempt::new(1));
    assert_eq!(
        alpha.status,
        CellStatus::Failed("Failed: incorrect final version".to_string())
    );
    assert_eq!(
        alpha.phases,
        vec![("trunk".to_string(), "3 seconds".to_string())]
    );
    assert_eq!(alpha.final_schema_version, Some(152));
    assert_eq!(alpha.expected_final_schema_version, Some(152));
    assert_eq!(alpha.alternates.len(), 1);
    assert!(row.cells[1].is_none());
}

#[tokio::test]
async fn test_unpublished_run_shows_as_pending() {
    let tmp = TempDir::new().unwrap();
    let store = ArtifactStore::new(tmp.path());
    let queue = Arc::new(MemoryWorkQueue::new());

    queue.enqueue(&key("I1", "alpha", 0), false).await.unwrap();
    queue.claim("w1").await.unwrap();

    // A worker has claimed the item and created its directory, but no report
    // has been published there yet.
    let dir = store.item_dir(&key("I1", "alpha", 0));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("worker"), "w1").unwrap();

    let builder = DashboardBuilder::new(queue, store, "http://ci/ci");
    let dashboard = builder.build(None).await.unwrap();

    let cell = dashboard.rows[0].cells[0].as_ref().unwrap();
    assert_eq!(cell.status, CellStatus::Pending);
    assert!(cell.phases.is_empty());
    assert!(cell.heartbeat_at.is_some());
}

#[tokio::test]
async fn test_limit_caps_rows() {
    let tmp = TempDir::new().unwrap();
    let queue = Arc::new(MemoryWorkQueue::new());

    for i in 0..5 {
        queue
            .enqueue(&key(&format!("I{}", i), "alpha", 0), false)
            .await
            .unwrap();
    }

    let builder = DashboardBuilder::new(queue, ArtifactStore::new(tmp.path()), "http://ci/ci");
    let dashboard = builder.build(Some(2)).await.unwrap();

    assert_eq!(dashboard.rows.len(), 2);
    assert_eq!(dashboard.stats.total, 5);
}
