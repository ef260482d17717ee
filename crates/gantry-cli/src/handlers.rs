//! Subcommand implementations.

use crate::config::CliConfig;
use gantry_core::keys::{Attempt, PatchsetRef, WorkItemKey};
use gantry_core::ports::{NotificationTransport, WorkQueue};
use gantry_core::{Error, Result};
use gantry_dashboard::DashboardBuilder;
use gantry_db::{Database, PgLogLedger, PgMigrationCatalog, PgWorkQueue};
use gantry_notify::{Dispatcher, WebhookTransport};
use gantry_report::{ArtifactStore, Publisher};
use gantry_worker::{GitCheckout, Worker, WorkerConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

async fn connect(config: &CliConfig) -> Result<Database> {
    Database::connect(&config.database_url).await
}

pub async fn enqueue(
    config: &CliConfig,
    change: String,
    revision: u32,
    jobs: Vec<String>,
    recheck: bool,
) -> Result<()> {
    let db = connect(config).await?;
    let queue = PgWorkQueue::new(db.pool().clone());

    let jobs = if jobs.is_empty() { queue.job_names().await? } else { jobs };
    if jobs.is_empty() {
        return Err(Error::Internal(
            "no jobs named and none known to the queue yet".to_string(),
        ));
    }

    let patchset = PatchsetRef::new(change, revision);
    for job in &jobs {
        // Queue the first attempt that does not exist yet, so re-running
        // enqueue for a patchset schedules a retry.
        let mut attempt = Attempt::FIRST;
        loop {
            let key = WorkItemKey::new(patchset.clone(), job.as_str(), attempt);
            if queue.get(&key).await?.is_none() {
                queue.enqueue(&key, recheck).await?;
                info!(key = %key, recheck, "Queued work item");
                break;
            }
            attempt = attempt.next();
        }
    }
    Ok(())
}

pub async fn work(config: &CliConfig, worker_config: &Path, once: bool) -> Result<()> {
    let worker_config = WorkerConfig::from_file(worker_config)?;
    let db = connect(config).await?;

    let queue = Arc::new(PgWorkQueue::new(db.pool().clone()));
    let ledger = Arc::new(match &worker_config.log_mirror_dir {
        Some(dir) => PgLogLedger::with_mirror(db.pool().clone(), dir.clone()),
        None => PgLogLedger::new(db.pool().clone()),
    });
    let checkout = Arc::new(GitCheckout::new(
        worker_config.tools_dir.clone(),
        worker_config.checkout_root.clone(),
    ));
    let worker = Worker::new(worker_config, queue, ledger, checkout);

    loop {
        match worker.run_once().await? {
            Some(_) if !once => continue,
            _ => break,
        }
    }
    Ok(())
}

pub async fn publish(config: &CliConfig) -> Result<()> {
    let db = connect(config).await?;
    let publisher = Publisher::new(
        Arc::new(PgWorkQueue::new(db.pool().clone())),
        Arc::new(PgLogLedger::new(db.pool().clone())),
        Arc::new(PgMigrationCatalog::new(db.pool().clone())),
        ArtifactStore::new(config.artifact_root.clone()),
    );

    let published = publisher.publish_completed().await?;
    info!(published, "Publication pass complete");
    Ok(())
}

pub async fn notify(config: &CliConfig) -> Result<()> {
    let db = connect(config).await?;
    let transport: Arc<dyn NotificationTransport> =
        Arc::new(WebhookTransport::new(config.require_webhook_url()?));
    let dispatcher = Dispatcher::new(
        Arc::new(PgWorkQueue::new(db.pool().clone())),
        transport,
        ArtifactStore::new(config.artifact_root.clone()),
        config.base_url.clone(),
        config.recipient.clone(),
    );

    let sent = dispatcher.dispatch().await?;
    info!(sent, "Notification pass complete");
    Ok(())
}

pub async fn dashboard(
    config: &CliConfig,
    limit: Option<u32>,
    output: Option<PathBuf>,
) -> Result<()> {
    let db = connect(config).await?;
    let builder = DashboardBuilder::new(
        Arc::new(PgWorkQueue::new(db.pool().clone())),
        ArtifactStore::new(config.artifact_root.clone()),
        config.base_url.clone(),
    );

    let page = gantry_dashboard::render(&builder.build(limit).await?);
    match output {
        Some(path) => {
            std::fs::write(&path, page)?;
            info!(path = %path.display(), "Dashboard written");
        }
        None => {
            let index = config.artifact_root.join("index.html");
            std::fs::write(&index, page)?;
            // The capped index gets an uncapped companion page.
            if limit.is_some() {
                let all = gantry_dashboard::render(&builder.build(None).await?);
                std::fs::write(config.artifact_root.join("all.html"), all)?;
            }
            info!(path = %index.display(), "Dashboard written");
        }
    }
    Ok(())
}

pub async fn migrate(config: &CliConfig) -> Result<()> {
    let db = connect(config).await?;
    db.migrate().await?;
    info!("Migrations applied");
    Ok(())
}
