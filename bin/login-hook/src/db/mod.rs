//! Postgres storage for console users and roles.

pub mod access_store;

pub use access_store::PgAccessStore;

use crate::error::HookError;
use rootcause::Report;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Connects to the database and runs pending migrations.
///
/// # Errors
///
/// Returns `HookError::Database` if the connection or a migration fails.
pub async fn connect(database_url: &str) -> Result<PgPool, Report<HookError>> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .map_err(|e| HookError::Database {
            details: e.to_string(),
        })?;

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| HookError::Database {
            details: e.to_string(),
        })?;

    Ok(pool)
}
