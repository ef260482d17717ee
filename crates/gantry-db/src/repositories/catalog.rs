//! PostgreSQL implementation of the MigrationCatalog port.

use async_trait::async_trait;
use gantry_core::keys::PatchsetRef;
use gantry_core::ports::MigrationCatalog;
use gantry_core::{Error, Result};
use sqlx::{PgPool, Row};

pub struct PgMigrationCatalog {
    pool: PgPool,
}

impl PgMigrationCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MigrationCatalog for PgMigrationCatalog {
    async fn name_for(&self, patchset: &PatchsetRef, migration: i64) -> Result<Option<String>> {
        let row = sqlx::query(
            "SELECT name FROM patchset_migrations \
             WHERE id = $1 AND number = $2 AND migration = $3",
        )
        .bind(&patchset.change)
        .bind(patchset.revision as i32)
        .bind(migration)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(row.map(|r| r.get("name")))
    }

    async fn max_migration(&self, patchset: &PatchsetRef) -> Result<Option<i64>> {
        let row = sqlx::query(
            "SELECT MAX(migration) AS max_migration FROM patchset_migrations \
             WHERE id = $1 AND number = $2",
        )
        .bind(&patchset.change)
        .bind(patchset.revision as i32)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(row.get("max_migration"))
    }
}
