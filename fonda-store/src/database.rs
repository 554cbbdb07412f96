use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::info;

use crate::app_config::DatabaseConfig;

/// Postgres pool shared by the three repositories and the change listener.
#[derive(Clone)]
pub struct DbClient {
    pub pool: PgPool,
}

impl DbClient {
    pub async fn connect(url: &str, settings: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            // the change listener holds one connection for itself
            .max_connections(settings.max_connections.max(2))
            .acquire_timeout(Duration::from_secs(settings.acquire_timeout_seconds))
            .connect(url)
            .await?;

        Ok(Self { pool })
    }

    /// Tables, indexes and the `notify_table_change` trigger.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        let migrator = sqlx::migrate!("../migrations");
        info!("Applying {} schema migrations", migrator.iter().count());
        migrator.run(&self.pool).await
    }
}
