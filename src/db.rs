//! SQLite pool construction and schema migration.

use anyhow::{Context, Result};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::{path::Path, str::FromStr, time::Duration};

/// Schema applied at start-up and by `--migrate`. Every statement is idempotent.
const INIT_SQL: &str = include_str!("../migrations/0001_init.sql");

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open a pool for `database_url`, creating the database file (and its
/// parent directory) when missing.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
    let db_path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .trim_start_matches("file:");
    tracing::debug!("Interpreted SQLite path => {}", db_path);

    let in_memory = db_path.starts_with(":memory:");
    if !in_memory {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating database directory {:?}", parent))?;
                tracing::info!("Created missing directory {:?}", parent);
            }
        }
    }

    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("parsing database url `{}`", database_url))?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT);

    let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections);
    if in_memory {
        // A memory database lives only as long as its connection.
        pool_options = pool_options.idle_timeout(None).max_lifetime(None);
    }

    let pool = pool_options
        .connect_with(options)
        .await
        .with_context(|| format!("connecting to {}", database_url))?;

    Ok(pool)
}

/// Run the embedded schema statements one by one.
pub async fn run_migrations(db: &SqlitePool) -> Result<()> {
    let statements = INIT_SQL
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    tracing::info!("Running {} migration statements...", statements.len());

    for stmt in statements {
        tracing::debug!("Executing migration SQL: {}", stmt);
        sqlx::query(stmt)
            .execute(db)
            .await
            .with_context(|| format!("executing migration statement `{}`", stmt))?;
    }

    Ok(())
}

/// In-memory database with the schema applied. A single connection keeps
/// every query on the same memory database.
#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    let pool = connect("sqlite::memory:", 1).await.expect("memory pool");
    run_migrations(&pool).await.expect("migrations");
    pool
}
