//! Consolidated once-per-patchset notification dispatch.

use gantry_core::keys::Attempt;
use gantry_core::ports::{NotificationTransport, WorkQueue};
use gantry_core::report::{job_display_name, ReportData};
use gantry_core::Result;
use gantry_report::ArtifactStore;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One job's contribution to the consolidated message. Only the highest
/// attempt per job is summarized.
struct JobSummary {
    job: String,
    attempt: Attempt,
    data: Option<ReportData>,
    log_url: String,
}

/// Walks patchsets with completed-but-unnotified work and announces each one
/// whose queue has fully drained. Notified flags flip only after the
/// transport accepts the message, so delivery is at-least-once and a failed
/// send is retried on the next run.
pub struct Dispatcher {
    queue: Arc<dyn WorkQueue>,
    transport: Arc<dyn NotificationTransport>,
    store: ArtifactStore,
    base_url: String,
    recipient: String,
}

impl Dispatcher {
    pub fn new(
        queue: Arc<dyn WorkQueue>,
        transport: Arc<dyn NotificationTransport>,
        store: ArtifactStore,
        base_url: impl Into<String>,
        recipient: impl Into<String>,
    ) -> Self {
        Self {
            queue,
            transport,
            store,
            base_url: base_url.into(),
            recipient: recipient.into(),
        }
    }

    /// Dispatch every eligible patchset. Returns how many messages were
    /// delivered.
    pub async fn dispatch(&self) -> Result<usize> {
        let mut sent = 0;
        for pair in self.queue.completed_unnotified_pairs().await? {
            let outstanding = self.queue.outstanding(&pair).await?;
            if outstanding > 0 {
                debug!(patchset = %pair, outstanding, "Work still queued, holding notification");
                continue;
            }

            let items = self.queue.completed_for(&pair).await?;
            if items.is_empty() {
                continue;
            }

            // Highest attempt per job carries the summary.
            let mut latest: BTreeMap<String, &gantry_core::work::WorkItem> = BTreeMap::new();
            for item in &items {
                match latest.get(&item.key.job) {
                    Some(existing) if existing.key.attempt >= item.key.attempt => {}
                    _ => {
                        latest.insert(item.key.job.clone(), item);
                    }
                }
            }

            let mut summaries = Vec::with_capacity(latest.len());
            for item in latest.values() {
                summaries.push(JobSummary {
                    job: item.key.job.clone(),
                    attempt: item.key.attempt,
                    data: self.store.load_data(&item.key)?,
                    log_url: self.store.log_url(&self.base_url, &item.key),
                });
            }

            let subject = format!("Patchset {}", pair);
            let body = render_body(&summaries);

            match self.transport.send(&subject, &self.recipient, &body).await {
                Ok(()) => {
                    for item in &items {
                        self.queue.mark_notified(&item.key).await?;
                    }
                    info!(patchset = %pair, jobs = summaries.len(), "Patchset notification sent");
                    sent += 1;
                }
                Err(e) => {
                    warn!(patchset = %pair, error = %e, "Delivery failed, will retry on next run");
                }
            }
        }
        Ok(sent)
    }
}

fn render_body(summaries: &[JobSummary]) -> String {
    let mut body = String::from("Results for a test are available.\n\n");
    for summary in summaries {
        body.push_str(&format!(
            "{} attempt {}:\n",
            job_display_name(&summary.job),
            summary.attempt
        ));
        if let Some(data) = &summary.data {
            if let Some(result) = &data.result {
                body.push_str(&format!("    {}\n", result));
            }
            for name in &data.order {
                if let Some(elapsed) = data.details.get(name) {
                    body.push_str(&format!("    {}: {}\n", name, elapsed));
                }
            }
        }
        body.push_str(&format!("    Log URL: {}\n\n", summary.log_url));
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn data(result: Option<&str>) -> ReportData {
        let mut details = BTreeMap::new();
        details.insert("trunk".to_string(), "5 seconds".to_string());
        details.insert("patchset".to_string(), "12 seconds".to_string());
        ReportData {
            order: vec!["trunk".to_string(), "patchset".to_string()],
            details,
            details_seconds: BTreeMap::new(),
            final_schema_version: Some(152),
            expected_final_schema_version: Some(152),
            result: result.map(str::to_string),
        }
    }

    #[test]
    fn test_render_body_with_result() {
        let summaries = vec![JobSummary {
            job: "sqlalchemy_migration_nova_mysql".to_string(),
            attempt: Attempt::new(1),
            data: Some(data(Some("Failed: patchset too slow"))),
            log_url: "http://ci/I1/2/sqlalchemy_migration_nova_mysql_attempt1/log.html".to_string(),
        }];

        let body = render_body(&summaries);
        assert_eq!(
            body,
            "Results for a test are available.\n\n\
             nova upgrade mysql attempt 1:\n    \
             Failed: patchset too slow\n    \
             trunk: 5 seconds\n    \
             patchset: 12 seconds\n    \
             Log URL: http://ci/I1/2/sqlalchemy_migration_nova_mysql_attempt1/log.html\n\n"
        );
    }

    #[test]
    fn test_render_body_passing_run_omits_result_line() {
        let summaries = vec![JobSummary {
            job: "plain_job".to_string(),
            attempt: Attempt::FIRST,
            data: Some(data(None)),
            log_url: "http://ci/I1/2/plain_job/log.html".to_string(),
        }];

        let body = render_body(&summaries);
        assert!(!body.contains("Failed"));
        assert!(body.contains("plain job attempt 0:\n"));
    }

    #[test]
    fn test_render_body_tolerates_missing_report() {
        let summaries = vec![JobSummary {
            job: "plain_job".to_string(),
            attempt: Attempt::FIRST,
            data: None,
            log_url: "http://ci/I1/2/plain_job/log.html".to_string(),
        }];

        let body = render_body(&summaries);
        assert_eq!(
            body,
            "Results for a test are available.\n\n\
             plain job attempt 0:\n    \
             Log URL: http://ci/I1/2/plain_job/log.html\n\n"
        );
    }
}
