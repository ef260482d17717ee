//! In-memory port implementations backed by mutex-guarded state.
//!
//! `MemoryWorkQueue::claim` holds its lock across the find-and-stamp, so it
//! gives the same exactly-one-winner guarantee the real store does.

use async_trait::async_trait;
use chrono::Utc;
use gantry_core::keys::{ClaimToken, PatchsetRef, WorkItemKey};
use gantry_core::ports::{LogLedger, MigrationCatalog, NotificationTransport, WorkQueue};
use gantry_core::work::{LogEntry, LogLine, QueueStats, WorkItem};
use gantry_core::{Error, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryWorkQueue {
    items: Mutex<Vec<WorkItem>>,
}

impl MemoryWorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every item, for assertions.
    pub fn items(&self) -> Vec<WorkItem> {
        self.items.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkQueue for MemoryWorkQueue {
    async fn enqueue(&self, key: &WorkItemKey, recheck: bool) -> Result<()> {
        let mut items = self.items.lock().unwrap();
        if items.iter().any(|i| &i.key == key) {
            return Ok(());
        }
        items.push(WorkItem {
            key: key.clone(),
            worker: None,
            claim_token: None,
            completed_at: None,
            heartbeat_at: None,
            notified: false,
            recheck,
        });
        Ok(())
    }

    async fn claim(&self, worker: &str) -> Result<Option<WorkItem>> {
        let mut items = self.items.lock().unwrap();
        let Some(item) = items.iter_mut().find(|i| !i.is_claimed()) else {
            return Ok(None);
        };
        item.claim_token = Some(ClaimToken::new());
        item.worker = Some(worker.to_string());
        item.heartbeat_at = Some(Utc::now());
        Ok(Some(item.clone()))
    }

    async fn get(&self, key: &WorkItemKey) -> Result<Option<WorkItem>> {
        Ok(self.items.lock().unwrap().iter().find(|i| &i.key == key).cloned())
    }

    async fn heartbeat(&self, key: &WorkItemKey, worker: &str) -> Result<()> {
        let mut items = self.items.lock().unwrap();
        for item in items.iter_mut() {
            if &item.key == key && item.worker.as_deref() == Some(worker) {
                item.heartbeat_at = Some(Utc::now());
            }
        }
        Ok(())
    }

    async fn complete(&self, key: &WorkItemKey) -> Result<()> {
        let mut items = self.items.lock().unwrap();
        let item = items
            .iter_mut()
            .find(|i| &i.key == key)
            .ok_or_else(|| Error::WorkItemNotFound(key.to_string()))?;
        item.completed_at = Some(Utc::now());
        Ok(())
    }

    async fn completed(&self) -> Result<Vec<WorkItem>> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.is_complete())
            .cloned()
            .collect())
    }

    async fn completed_unnotified_pairs(&self) -> Result<Vec<PatchsetRef>> {
        let items = self.items.lock().unwrap();
        let mut pairs = Vec::new();
        for item in items.iter() {
            if item.is_complete() && !item.notified && !pairs.contains(&item.key.patchset) {
                pairs.push(item.key.patchset.clone());
            }
        }
        Ok(pairs)
    }

    async fn outstanding(&self, pair: &PatchsetRef) -> Result<u64> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|i| &i.key.patchset == pair && !i.is_complete())
            .count() as u64)
    }

    async fn completed_for(&self, pair: &PatchsetRef) -> Result<Vec<WorkItem>> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|i| &i.key.patchset == pair && i.is_complete())
            .cloned()
            .collect())
    }

    async fn mark_notified(&self, key: &WorkItemKey) -> Result<()> {
        let mut items = self.items.lock().unwrap();
        for item in items.iter_mut() {
            if &item.key == key {
                item.notified = true;
            }
        }
        Ok(())
    }

    async fn recent_pairs(&self, limit: Option<u32>) -> Result<Vec<PatchsetRef>> {
        let items = self.items.lock().unwrap();
        let mut latest: Vec<(PatchsetRef, Option<chrono::DateTime<Utc>>)> = Vec::new();
        for item in items.iter() {
            match latest.iter_mut().find(|(p, _)| p == &item.key.patchset) {
                Some((_, hb)) => {
                    if item.heartbeat_at > *hb {
                        *hb = item.heartbeat_at;
                    }
                }
                None => latest.push((item.key.patchset.clone(), item.heartbeat_at)),
            }
        }
        latest.sort_by(|a, b| b.1.cmp(&a.1));
        let mut pairs: Vec<PatchsetRef> = latest.into_iter().map(|(p, _)| p).collect();
        if let Some(limit) = limit {
            pairs.truncate(limit as usize);
        }
        Ok(pairs)
    }

    async fn job_names(&self) -> Result<Vec<String>> {
        let items = self.items.lock().unwrap();
        let mut jobs: Vec<String> = Vec::new();
        for item in items.iter() {
            if !jobs.contains(&item.key.job) {
                jobs.push(item.key.job.clone());
            }
        }
        jobs.sort();
        Ok(jobs)
    }

    async fn stats(&self) -> Result<QueueStats> {
        let items = self.items.lock().unwrap();
        Ok(QueueStats {
            total: items.len() as u64,
            rechecks: items.iter().filter(|i| i.recheck).count() as u64,
            completed: items.iter().filter(|i| i.is_complete()).count() as u64,
            queued: items.iter().filter(|i| !i.is_complete()).count() as u64,
            latest_heartbeat: items.iter().filter_map(|i| i.heartbeat_at).max(),
        })
    }
}

#[derive(Default)]
pub struct MemoryLedger {
    entries: Mutex<HashMap<WorkItemKey, Vec<LogEntry>>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LogLedger for MemoryLedger {
    async fn append(&self, key: &WorkItemKey, worker: &str, lines: &[LogLine]) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        let bucket = entries.entry(key.clone()).or_default();
        for line in lines {
            bucket.push(LogEntry {
                worker: worker.to_string(),
                timestamp: line.timestamp,
                text: line.text.clone(),
            });
        }
        Ok(())
    }

    async fn clear(&self, key: &WorkItemKey) -> Result<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn entries(&self, key: &WorkItemKey) -> Result<Vec<LogEntry>> {
        let mut found = self
            .entries
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .unwrap_or_default();
        found.sort_by_key(|e| e.timestamp);
        Ok(found)
    }
}

/// Fixed migration catalog.
#[derive(Default)]
pub struct MemoryCatalog {
    names: HashMap<i64, String>,
    max: Option<i64>,
}

impl MemoryCatalog {
    pub fn new(max: Option<i64>) -> Self {
        Self {
            names: HashMap::new(),
            max,
        }
    }

    pub fn with_name(mut self, migration: i64, name: impl Into<String>) -> Self {
        self.names.insert(migration, name.into());
        self
    }
}

#[async_trait]
impl MigrationCatalog for MemoryCatalog {
    async fn name_for(&self, _patchset: &PatchsetRef, migration: i64) -> Result<Option<String>> {
        Ok(self.names.get(&migration).cloned())
    }

    async fn max_migration(&self, _patchset: &PatchsetRef) -> Result<Option<i64>> {
        Ok(self.max)
    }
}

/// A delivered message captured by [`RecordingTransport`].
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub subject: String,
    pub recipient: String,
    pub body: String,
}

/// Records accepted messages; the first `fail_remaining` sends are refused.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<SentMessage>>,
    fail_remaining: AtomicUsize,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(times: usize) -> Self {
        let transport = Self::default();
        transport.fail_remaining.store(times, Ordering::SeqCst);
        transport
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationTransport for RecordingTransport {
    async fn send(&self, subject: &str, recipient: &str, body: &str) -> Result<()> {
        if self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(Error::Notify("transport refused delivery".to_string()));
        }
        self.sent.lock().unwrap().push(SentMessage {
            subject: subject.to_string(),
            recipient: recipient.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}
