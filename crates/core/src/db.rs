//! Database connection and schema management.
//!
//! The clinic store is SQLite accessed through a `sqlx` pool. Migrations under
//! `crates/core/migrations` are embedded at compile time and applied at startup.

use crate::ClinicResult;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// Open a connection pool for `database_url`, creating the database file if needed.
///
/// In-memory databases exist per connection, so they are pinned to a single connection
/// that is never recycled; otherwise the schema would silently disappear.
pub async fn connect(database_url: &str) -> ClinicResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = if is_in_memory(database_url) {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?
    };

    tracing::debug!("connected to {}", redact(database_url));
    Ok(pool)
}

/// Apply all pending embedded migrations.
pub async fn migrate(pool: &SqlitePool) -> ClinicResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Connect and migrate in one step.
pub async fn connect_and_migrate(database_url: &str) -> ClinicResult<SqlitePool> {
    let pool = connect(database_url).await?;
    migrate(&pool).await?;
    Ok(pool)
}

/// A fresh, migrated in-memory database. Used by tests across the workspace.
pub async fn in_memory() -> ClinicResult<SqlitePool> {
    connect_and_migrate("sqlite::memory:").await
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

fn redact(database_url: &str) -> &str {
    database_url.split('?').next().unwrap_or(database_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrations_seed_system_roles() {
        let pool = in_memory().await.unwrap();
        let names: Vec<String> = sqlx::query_scalar("SELECT name FROM roles ORDER BY id")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(names, vec!["admin", "doctor", "receptionist", "lab_technician"]);
    }

    #[tokio::test]
    async fn file_database_is_created_and_reusable() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let url = format!("sqlite://{}", dir.path().join("clinic.db").display());

        let pool = connect_and_migrate(&url).await.unwrap();
        pool.close().await;

        // Re-running migrations against an existing database is a no-op.
        let pool = connect_and_migrate(&url).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM roles")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 4);
    }
}
