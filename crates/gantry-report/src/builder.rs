//! Single-pass report builder over one work item's ledger.

use crate::classify::{classify_clean, classify_raw, clean, CleanEvent, RawEvent};
use crate::render::{escape, render_document};
use chrono::{DateTime, Utc};
use gantry_core::keys::PatchsetRef;
use gantry_core::ports::MigrationCatalog;
use gantry_core::report::{format_duration, Report, UpgradePhase, Verdict};
use gantry_core::work::LogEntry;
use gantry_core::Result;
use std::collections::HashMap;

/// Name of the phase that applies the patchset's own migrations. This phase
/// carries the runtime budget.
const PATCHSET_PHASE: &str = "patchset";

/// Longest acceptable patchset phase, in seconds. Exactly 30 passes.
const PATCHSET_BUDGET_SECS: i64 = 30;

/// Builds a [`Report`] from a ledger in one pass, strictly in ascending
/// timestamp order. Stateless between invocations: re-running over an
/// unchanged ledger yields an identical Report.
pub struct ReportBuilder<'a> {
    catalog: &'a dyn MigrationCatalog,
}

struct OpenUpgrade {
    name: String,
    started: DateTime<Utc>,
}

struct OpenMigration {
    started: DateTime<Utc>,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(catalog: &'a dyn MigrationCatalog) -> Self {
        Self { catalog }
    }

    pub async fn build(&self, patchset: &PatchsetRef, entries: &[LogEntry]) -> Result<Report> {
        let mut lines: Vec<String> = Vec::new();
        let mut order: Vec<String> = Vec::new();
        let mut durations: HashMap<String, i64> = HashMap::new();
        let mut in_upgrade: Option<OpenUpgrade> = None;
        let mut open_migration: Option<OpenMigration> = None;
        let mut final_version: Option<i64> = None;
        let mut verdict: Option<Verdict> = None;

        for (line_number, entry) in entries.iter().enumerate() {
            let raw_event = classify_raw(&entry.text);

            match &raw_event {
                Some(RawEvent::FinalVersion(v)) => final_version = Some(*v),
                Some(RawEvent::UpgradeBegin(name)) => {
                    order.push(name.clone());
                    in_upgrade = Some(OpenUpgrade {
                        name: name.clone(),
                        started: entry.timestamp,
                    });
                    lines.push(format!("<a name=\"{}\"></a>", name));
                }
                Some(RawEvent::MigrationClash) => {
                    verdict = Some(Verdict::MigrationNumberClash);
                }
                _ => {}
            }

            // An open phase brackets its own begin and finish lines, so the
            // bold state is decided before the finish marker is handled.
            let bold = in_upgrade.is_some();
            let mut line = format!(
                "<a name=\"{n}\"></a><a href=\"#{n}\">#</a> ",
                n = line_number
            );
            if bold {
                line.push_str("<b>");
            }

            let cleaned = clean(&entry.text);
            let mut body = escape(&cleaned);

            match classify_clean(&cleaned) {
                Some(CleanEvent::MigrationEnd) => {
                    if let Some(open) = open_migration.take() {
                        let elapsed = (entry.timestamp - open.started).num_seconds();
                        body.push_str(&format!(
                            "              <font color=\"red\">[{}]</font>",
                            format_duration(elapsed)
                        ));
                    }
                }
                Some(CleanEvent::MigrationBegin { to, .. }) => {
                    open_migration = Some(OpenMigration {
                        started: entry.timestamp,
                    });
                    if let Some(name) = self.catalog.name_for(patchset, to).await? {
                        body.push_str(&format!(
                            "     <font color=\"red\">[{}]</font>",
                            escape(&name)
                        ));
                    }
                }
                None => {}
            }

            line.push_str(&format!(
                "{} {}",
                entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                body
            ));
            if bold {
                line.push_str("</b>");
            }
            line.push('\n');
            lines.push(line);

            if let Some(RawEvent::UpgradeEnd(_)) = raw_event {
                if let Some(open) = in_upgrade.take() {
                    let elapsed = (entry.timestamp - open.started).num_seconds();
                    lines.push(format!(
                        "{}<font color=\"red\"><b>[{} total]</b></font>\n",
                        " ".repeat(40),
                        format_duration(elapsed)
                    ));
                    durations.insert(open.name, elapsed);
                }
            }
        }

        // Post-pass: assemble phases in encounter order. A phase whose
        // finish marker never arrived stays open, with no elapsed time.
        let phases: Vec<UpgradePhase> = order
            .iter()
            .map(|name| UpgradePhase {
                name: name.clone(),
                elapsed_secs: durations.get(name).copied(),
            })
            .collect();

        let summary_items: Vec<String> = phases
            .iter()
            .map(|phase| {
                format!(
                    "<li><a href=\"#{name}\">Upgrade to {name} -- {elapsed}</a>",
                    name = phase.name,
                    elapsed = phase.elapsed_display()
                )
            })
            .collect();

        for phase in &phases {
            if phase.name == PATCHSET_PHASE
                && phase.elapsed_secs.is_some_and(|secs| secs > PATCHSET_BUDGET_SECS)
            {
                verdict = Some(Verdict::PatchsetTooSlow);
            }
        }

        let mut expected_version = None;
        if let Some(v) = final_version {
            let max = self.catalog.max_migration(patchset).await?;
            expected_version = max;
            if max != Some(v) {
                verdict = Some(Verdict::IncorrectFinalVersion);
            }
        }

        Ok(Report {
            phases,
            final_version,
            expected_version,
            verdict,
            html: render_document(patchset, &summary_items, &lines),
        })
    }
}
