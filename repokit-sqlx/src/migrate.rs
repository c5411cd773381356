//! Ordered schema migrations applied at connect time.
//!
//! Migrations are plain SQL run in registration order. They are not tracked
//! in a history table, so each script should be idempotent
//! (`CREATE TABLE IF NOT EXISTS ...`).

use crate::database::Database;
use repokit_data::DataError;

/// A named SQL script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub name: String,
    pub sql: String,
}

impl Migration {
    pub fn new(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
        }
    }
}

impl Database {
    /// Run `migrations` in order, stopping at the first failure.
    pub async fn migrate(&self, migrations: &[Migration]) -> Result<(), DataError> {
        for migration in migrations {
            tracing::info!(migration = %migration.name, "applying migration");
            sqlx::raw_sql(&migration.sql)
                .execute(self.pool())
                .await
                .map_err(|e| {
                    tracing::error!(migration = %migration.name, error = %e, "migration failed");
                    DataError::connection(e)
                })?;
        }
        Ok(())
    }
}
