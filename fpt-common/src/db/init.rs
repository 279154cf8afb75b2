//! Database initialization
//!
//! Opens (creating if needed) the SQLite database behind the remote store
//! and makes sure every table exists. Safe to run on every startup.

use std::path::Path;

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tracing::info;

use crate::Result;

/// Open a database file, creating it and its parent directory if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = connect(&db_url, 5).await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    Ok(pool)
}

/// Open a database by URL (e.g. `sqlite://data/fpt.db?mode=rwc`)
pub async fn init_database_url(url: &str) -> Result<SqlitePool> {
    let pool = connect(url, 5).await?;
    info!("Opened database: {}", url);
    Ok(pool)
}

/// Private in-memory database with the full schema.
///
/// Every SQLite memory connection is its own database, so the pool is held
/// to a single connection.
pub async fn init_memory_database() -> Result<SqlitePool> {
    connect("sqlite::memory:", 1).await
}

async fn connect(url: &str, max_connections: u32) -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await?;

    // WAL lets readers proceed while a replace transaction is open
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;
    Ok(pool)
}

/// Create all tables (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_matrix_data_table(pool).await?;
    create_matrix_metadata_table(pool).await?;
    create_features_table(pool).await?;
    Ok(())
}

async fn create_matrix_data_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS matrix_data (
            id INTEGER PRIMARY KEY,
            "Priority" TEXT,
            "Risk" TEXT,
            "Confidence" TEXT,
            "Data" TEXT,
            "Size" TEXT,
            "Timing" TEXT,
            "Recommendation" TEXT,
            extra TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_matrix_metadata_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS matrix_metadata (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            last_updated TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_features_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS features (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            priority TEXT NOT NULL DEFAULT '',
            risk TEXT NOT NULL DEFAULT '',
            confidence TEXT NOT NULL DEFAULT '',
            data TEXT NOT NULL DEFAULT '',
            size TEXT NOT NULL DEFAULT '',
            timing TEXT NOT NULL DEFAULT '',
            recommendation TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_features_name ON features(name)")
        .execute(pool)
        .await?;

    Ok(())
}
