//! Per-work-item artifact layout.
//!
//! Each published work item owns a directory
//! `<root>/<change>/<revision>/<job><attempt-suffix>/` holding a `worker`
//! marker, a `state` marker, the rendered `log.html`, and the
//! machine-readable `data` report. Consumers tolerate missing artifacts: a
//! job that has not run yet simply has no directory.

use gantry_core::keys::{Attempt, PatchsetRef, WorkItemKey};
use gantry_core::report::{Report, ReportData};
use gantry_core::Result;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn dir_for(&self, patchset: &PatchsetRef, job: &str, attempt: Attempt) -> PathBuf {
        self.root
            .join(&patchset.change)
            .join(patchset.revision.to_string())
            .join(format!("{}{}", job, attempt.path_suffix()))
    }

    pub fn item_dir(&self, key: &WorkItemKey) -> PathBuf {
        self.dir_for(&key.patchset, &key.job, key.attempt)
    }

    /// Relative URL of the rendered log under a dashboard/notification base.
    pub fn log_url(&self, base: &str, key: &WorkItemKey) -> String {
        format!(
            "{}/{}/{}/{}{}/log.html",
            base.trim_end_matches('/'),
            key.patchset.change,
            key.patchset.revision,
            key.job,
            key.attempt.path_suffix()
        )
    }

    /// Write the full artifact set for one work item.
    pub fn write(&self, key: &WorkItemKey, worker: &str, state: &str, report: &Report) -> Result<()> {
        let dir = self.item_dir(key);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join("worker"), worker)?;
        fs::write(dir.join("state"), state)?;
        fs::write(dir.join("log.html"), &report.html)?;
        fs::write(dir.join("data"), serde_json::to_vec(&report.data())?)?;
        Ok(())
    }

    /// Worker recorded by a previous publication, if any.
    pub fn recorded_worker(&self, key: &WorkItemKey) -> Option<String> {
        fs::read_to_string(self.item_dir(key).join("worker"))
            .ok()
            .map(|s| s.trim_end().to_string())
    }

    /// Load the machine-readable report. Missing artifacts are not an
    /// error: the job has not run, or is still running.
    pub fn load_data(&self, key: &WorkItemKey) -> Result<Option<ReportData>> {
        let path = self.item_dir(key).join("data");
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Highest published attempt for a job, discovered from the directory
    /// layout: attempts are dense starting at 0.
    pub fn latest_attempt(&self, patchset: &PatchsetRef, job: &str) -> Option<Attempt> {
        let mut attempt = Attempt::FIRST;
        if !self.dir_for(patchset, job, attempt).exists() {
            return None;
        }
        while self.dir_for(patchset, job, attempt.next()).exists() {
            attempt = attempt.next();
        }
        Some(attempt)
    }
}
