//! Database module
//!
//! Connection and schema utilities.

use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};

use crate::Config;

/// Initial schema, applied by tests and the load test tool
pub const INIT_SCHEMA: &str = include_str!("../migrations/20240101000000_init.sql");

const REQUIRED_TABLES: &[&str] = &["users", "accounts", "transactions"];

/// Open a pool sized from configuration
pub async fn connect(config: &Config) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
}

/// Simple connectivity check
pub async fn verify_connection(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the schema. Every statement is idempotent.
pub async fn apply_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    pool.execute(INIT_SCHEMA).await?;
    Ok(())
}

/// Check if required tables exist
pub async fn check_schema(pool: &PgPool) -> Result<bool, sqlx::Error> {
    for table in REQUIRED_TABLES {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = $1
            )
            "#,
        )
        .bind(*table)
        .fetch_one(pool)
        .await?;

        if !exists {
            tracing::error!(table, "Required table does not exist");
            return Ok(false);
        }
    }

    Ok(true)
}
