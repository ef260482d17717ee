//! Derived report types for one work item's log ledger.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Pass/fail determination for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    MigrationNumberClash,
    PatchsetTooSlow,
    IncorrectFinalVersion,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Verdict::MigrationNumberClash => "migration number clash",
            Verdict::PatchsetTooSlow => "patchset too slow",
            Verdict::IncorrectFinalVersion => "incorrect final version",
        };
        write!(f, "Failed: {}", reason)
    }
}

/// One bounded upgrade interval in the log, in encounter order.
///
/// `elapsed_secs` is None for a phase whose finish marker never arrived;
/// the builder reports it as still open rather than failing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradePhase {
    pub name: String,
    pub elapsed_secs: Option<i64>,
}

impl UpgradePhase {
    /// Human-readable elapsed time, `in progress` when unterminated.
    pub fn elapsed_display(&self) -> String {
        match self.elapsed_secs {
            Some(secs) => format_duration(secs),
            None => "in progress".to_string(),
        }
    }
}

/// Structured result of one Report Builder pass.
///
/// Always recomputed whole from the ledger; two passes over an unchanged
/// ledger produce identical values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub phases: Vec<UpgradePhase>,
    pub final_version: Option<i64>,
    pub expected_version: Option<i64>,
    pub verdict: Option<Verdict>,
    pub html: String,
}

impl Report {
    /// The machine-readable artifact written next to the rendered log.
    pub fn data(&self) -> ReportData {
        let mut details = BTreeMap::new();
        let mut details_seconds = BTreeMap::new();
        for phase in &self.phases {
            details.insert(phase.name.clone(), phase.elapsed_display());
            if let Some(secs) = phase.elapsed_secs {
                details_seconds.insert(phase.name.clone(), secs);
            }
        }
        ReportData {
            order: self.phases.iter().map(|p| p.name.clone()).collect(),
            details,
            details_seconds,
            final_schema_version: self.final_version,
            expected_final_schema_version: self.expected_version,
            result: self.verdict.map(|v| v.to_string()),
        }
    }
}

/// JSON shape of the per-work-item `data` artifact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportData {
    pub order: Vec<String>,
    pub details: BTreeMap<String, String>,
    pub details_seconds: BTreeMap<String, i64>,
    pub final_schema_version: Option<i64>,
    pub expected_final_schema_version: Option<i64>,
    pub result: Option<String>,
}

/// Render elapsed seconds for display. Minutes are never rolled into hours.
pub fn format_duration(secs: i64) -> String {
    if secs < 60 {
        return format!("{} seconds", secs);
    }
    format!("{} minutes, {} seconds", secs / 60, secs % 60)
}

/// Human-readable form of a job name for summaries and dashboards.
pub fn job_display_name(job: &str) -> String {
    job.replace("sqlalchemy_migration_nova", "nova upgrade")
        .replace('_', " ")
}
