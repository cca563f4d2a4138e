use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Creates a PostgreSQL connection pool and applies pending migrations.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Database migration failed")?;
    info!("Database migrations applied");

    Ok(pool)
}
