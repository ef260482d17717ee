//! PostgreSQL implementation of the WorkQueue port.

use async_trait::async_trait;
use gantry_core::keys::{Attempt, ClaimToken, PatchsetRef, WorkItemKey};
use gantry_core::ports::WorkQueue;
use gantry_core::work::{QueueStats, WorkItem};
use gantry_core::{Error, Result};
use sqlx::{PgPool, Row};

const ITEM_COLUMNS: &str =
    "id, number, workname, attempt, worker, claim_token, heartbeat_at, completed_at, notified, recheck";

/// PostgreSQL implementation of the WorkQueue port.
pub struct PgWorkQueue {
    pool: PgPool,
}

impl PgWorkQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_item(&self, r: &sqlx::postgres::PgRow) -> Result<WorkItem> {
        let key = WorkItemKey {
            patchset: PatchsetRef {
                change: r.get("id"),
                revision: r.get::<i32, _>("number") as u32,
            },
            job: r.get("workname"),
            attempt: Attempt::from_db(r.get::<Option<i32>, _>("attempt")),
        };
        Ok(WorkItem {
            key,
            worker: r.get("worker"),
            claim_token: r
                .get::<Option<uuid::Uuid>, _>("claim_token")
                .map(ClaimToken::from_uuid),
            completed_at: r.get("completed_at"),
            heartbeat_at: r.get("heartbeat_at"),
            notified: r.get("notified"),
            recheck: r.get("recheck"),
        })
    }

    fn row_to_pair(r: &sqlx::postgres::PgRow) -> PatchsetRef {
        PatchsetRef {
            change: r.get("id"),
            revision: r.get::<i32, _>("number") as u32,
        }
    }
}

#[async_trait]
impl WorkQueue for PgWorkQueue {
    async fn enqueue(&self, key: &WorkItemKey, recheck: bool) -> Result<()> {
        sqlx::query(
            "INSERT INTO work_queue (id, number, workname, attempt, recheck) \
             VALUES ($1, $2, $3, $4, $5) ON CONFLICT DO NOTHING",
        )
        .bind(&key.patchset.change)
        .bind(key.patchset.revision as i32)
        .bind(&key.job)
        .bind(key.attempt.to_db())
        .bind(recheck)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    async fn claim(&self, worker: &str) -> Result<Option<WorkItem>> {
        // The read-modify-decide is one conditional update at the store:
        // at most one arbitrarily-chosen unclaimed row gets the token, and
        // SKIP LOCKED keeps concurrent claimers off the same row.
        let token = ClaimToken::new();
        let result = sqlx::query(
            "UPDATE work_queue \
             SET claim_token = $1, worker = $2, heartbeat_at = NOW() \
             WHERE ctid IN (\
                 SELECT ctid FROM work_queue \
                 WHERE claim_token IS NULL \
                 LIMIT 1 FOR UPDATE SKIP LOCKED)",
        )
        .bind(token.as_uuid())
        .bind(worker)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let row = sqlx::query(&format!(
            "SELECT {} FROM work_queue WHERE claim_token = $1",
            ITEM_COLUMNS
        ))
        .bind(token.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(Some(self.row_to_item(&row)?))
    }

    async fn get(&self, key: &WorkItemKey) -> Result<Option<WorkItem>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM work_queue \
             WHERE id = $1 AND number = $2 AND workname = $3 \
             AND attempt IS NOT DISTINCT FROM $4",
            ITEM_COLUMNS
        ))
        .bind(&key.patchset.change)
        .bind(key.patchset.revision as i32)
        .bind(&key.job)
        .bind(key.attempt.to_db())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(self.row_to_item(&r)?)),
            None => Ok(None),
        }
    }

    async fn heartbeat(&self, key: &WorkItemKey, worker: &str) -> Result<()> {
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
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    async fn complete(&self, key: &WorkItemKey) -> Result<()> {
        sqlx::query(
            "UPDATE work_queue SET completed_at = NOW() \
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

    async fn completed(&self) -> Result<Vec<WorkItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM work_queue WHERE completed_at IS NOT NULL",
            ITEM_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;
        rows.iter().map(|r| self.row_to_item(r)).collect()
    }

    async fn completed_unnotified_pairs(&self) -> Result<Vec<PatchsetRef>> {
        let rows = sqlx::query(
            "SELECT DISTINCT id, number FROM work_queue \
             WHERE completed_at IS NOT NULL AND notified = FALSE",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.iter().map(Self::row_to_pair).collect())
    }

    async fn outstanding(&self, pair: &PatchsetRef) -> Result<u64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS outstanding FROM work_queue \
             WHERE id = $1 AND number = $2 AND completed_at IS NULL",
        )
        .bind(&pair.change)
        .bind(pair.revision as i32)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(row.get::<i64, _>("outstanding") as u64)
    }

    async fn completed_for(&self, pair: &PatchsetRef) -> Result<Vec<WorkItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM work_queue \
             WHERE id = $1 AND number = $2 AND completed_at IS NOT NULL",
            ITEM_COLUMNS
        ))
        .bind(&pair.change)
        .bind(pair.revision as i32)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;
        rows.iter().map(|r| self.row_to_item(r)).collect()
    }

    async fn mark_notified(&self, key: &WorkItemKey) -> Result<()> {
        sqlx::query(
            "UPDATE work_queue SET notified = TRUE \
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

    async fn recent_pairs(&self, limit: Option<u32>) -> Result<Vec<PatchsetRef>> {
        // LIMIT NULL means no limit.
        let rows = sqlx::query(
            "SELECT id, number, MAX(heartbeat_at) AS latest FROM work_queue \
             GROUP BY id, number \
             ORDER BY latest DESC NULLS LAST \
             LIMIT $1",
        )
        .bind(limit.map(|n| n as i64))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.iter().map(Self::row_to_pair).collect())
    }

    async fn job_names(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT DISTINCT workname FROM work_queue ORDER BY workname")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.iter().map(|r| r.get("workname")).collect())
    }

    async fn stats(&self) -> Result<QueueStats> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total, \
                    COUNT(*) FILTER (WHERE recheck) AS rechecks, \
                    COUNT(*) FILTER (WHERE completed_at IS NOT NULL) AS completed, \
                    COUNT(*) FILTER (WHERE completed_at IS NULL) AS queued, \
                    MAX(heartbeat_at) AS latest_heartbeat \
             FROM work_queue",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(QueueStats {
            total: row.get::<i64, _>("total") as u64,
            rechecks: row.get::<i64, _>("rechecks") as u64,
            completed: row.get::<i64, _>("completed") as u64,
            queued: row.get::<i64, _>("queued") as u64,
            latest_heartbeat: row.get("latest_heartbeat"),
        })
    }
}
