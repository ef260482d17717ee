//! PostgreSQL implementation of the LogLedger port.

use async_trait::async_trait;
use gantry_core::keys::WorkItemKey;
use gantry_core::ports::LogLedger;
use gantry_core::work::{LogEntry, LogLine};
use gantry_core::{Error, Result};
use sqlx::{PgPool, Row};
use std::io::Write;
use std::path::PathBuf;
use tracing::warn;

/// PostgreSQL implementation of the LogLedger port.
///
/// The database is the sole source of truth. When a mirror directory is
/// configured, each appended batch is also written to a local append-only
/// file for operator inspection; mirror failures are logged and swallowed.
pub struct PgLogLedger {
    pool: PgPool,
    mirror_dir: Option<PathBuf>,
}

impl PgLogLedger {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            mirror_dir: None,
        }
    }

    pub fn with_mirror(pool: PgPool, mirror_dir: PathBuf) -> Self {
        Self {
            pool,
            mirror_dir: Some(mirror_dir),
        }
    }

    fn mirror_batch(&self, key: &WorkItemKey, lines: &[LogLine]) {
        let Some(root) = &self.mirror_dir else {
            return;
        };
        let dir = root.join(&key.patchset.change).join(key.patchset.revision.to_string());
        let path = dir.join(format!("{}{}.log", key.job, key.attempt.path_suffix()));
        if let Err(e) = Self::append_mirror_file(&dir, &path, lines) {
            warn!(path = %path.display(), error = %e, "Log mirror write failed");
        }
    }

    fn append_mirror_file(
        dir: &std::path::Path,
        path: &std::path::Path,
        lines: &[LogLine],
    ) -> std::io::Result<()> {
        std::fs::create_dir_all(dir)?;
        let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
        for line in lines {
            writeln!(file, "{} {}", line.timestamp, line.text.trim_end())?;
        }
        Ok(())
    }
}

#[async_trait]
impl LogLedger for PgLogLedger {
    async fn append(&self, key: &WorkItemKey, worker: &str, lines: &[LogLine]) -> Result<()> {
        if lines.is_empty() {
            return Ok(());
        }

        // One transaction: every line of the batch, then the heartbeat
        // refresh. A worker is never observed live without its most recent
        // output already durable.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        for line in lines {
            sqlx::query(
                "INSERT INTO work_logs (id, number, workname, worker, attempt, log, timestamp) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(&key.patchset.change)
            .bind(key.patchset.revision as i32)
            .bind(&key.job)
            .bind(worker)
            .bind(key.attempt.to_db())
            .bind(&line.text)
            .bind(line.timestamp)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        }

        sqlx::query(
            "UPDATE work_queue SET heartbeat_at = NOW() \
             WHERE id = $1 AND number = $2 AND workname = $3 \
             AND worker = $4 AND attempt IS NOT DISTINCT FROM $5",
        )
        .bind(&key.patchset.change)
        .bind(key.patchset.revision as i32)
        .bind(&key.job)
        .bind(worker)
        .bind(key.attempt.to_db())
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        self.mirror_batch(key, lines);
        Ok(())
    }

    async fn clear(&self, key: &WorkItemKey) -> Result<()> {
        sqlx::query(
            "DELETE FROM work_logs \
             WHERE id = $1 AND number = $2 AND workname = $3 \
             AND attempt IS NOT DISTINCT FROM $4",
        )
        .bind(&key.patchset.change)
        .bind(key.patchset.revision as i32)
        .bind(&key.job)
        .bind(key.attempt.to_db())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    async fn entries(&self, key: &WorkItemKey) -> Result<Vec<LogEntry>> {
        let rows = sqlx::query(
            "SELECT worker, timestamp, log FROM work_logs \
             WHERE id = $1 AND number = $2 AND workname = $3 \
             AND attempt IS NOT DISTINCT FROM $4 \
             ORDER BY timestamp ASC",
        )
        .bind(&key.patchset.change)
        .bind(key.patchset.revision as i32)
        .bind(&key.job)
        .bind(key.attempt.to_db())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(rows
            .iter()
            .map(|r| LogEntry {
                worker: r.get("worker"),
                timestamp: r.get("timestamp"),
                text: r.get("log"),
            })
            .collect())
    }
}
