// Connection pool and migrations

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use smartstudy_core::StoreError;

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create database connection from URL
    pub async fn from_url(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self { pool })
    }

    /// Apply the embedded schema migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map a sqlx error to a store error; check violations become `Invalid`
pub(crate) fn store_error(err: sqlx::Error) -> StoreError {
    if let Some(db_err) = err.as_database_error() {
        if let Some(constraint) = db_err.constraint() {
            let field = match constraint {
                "events_end_after_start" => "end",
                other => other,
            };
            return StoreError::invalid(field, db_err.message());
        }
    }
    StoreError::backend(err.to_string())
}
