//! Shared setup for database-backed tests.

use crate::containers::PostgresContainer;
use gantry_db::Database;

/// A migrated database on a fresh PostgreSQL container.
pub struct TestContext {
    #[allow(dead_code)] // Kept to maintain container lifetime
    postgres: PostgresContainer,
    pub db: Database,
}

impl TestContext {
    pub async fn postgres() -> anyhow::Result<Self> {
        let postgres = PostgresContainer::start().await?;
        let db = Database::connect(postgres.connection_string()).await?;
        db.migrate().await?;
        Ok(Self { postgres, db })
    }
}
