//! Remote table store
//!
//! The shared relational copy of the matrix. Canonical columns live in their
//! own SQL columns; anything else a table carries rides along in `extra` as
//! a JSON object, so a replace followed by a fetch returns the same rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use sqlx::SqlitePool;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::db::init_database_url;
use crate::model::{Row, Table, CANONICAL_COLUMNS};
use crate::time;
use crate::{Error, Result};

/// Whole-table access to the remote store
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Short human-readable description for logs
    fn describe(&self) -> String;

    /// Liveness probe; returns the current row count
    async fn probe(&self) -> Result<u64>;

    /// All rows, in stored order
    async fn fetch_all(&self) -> Result<Table>;

    /// Stamp of the last replace, if one was recorded
    async fn last_modified(&self) -> Result<Option<DateTime<Utc>>>;

    /// Replace every row and record `stamp` as the modification time
    async fn replace_all(&self, rows: &[Row], stamp: DateTime<Utc>) -> Result<()>;
}

/// SQLite-backed remote store
#[derive(Clone)]
pub struct SqlStore {
    pool: SqlitePool,
}

type MatrixRecord = (
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

impl SqlStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Split a row into canonical cells (NULL when absent) and the `extra` JSON
fn to_record(row: &Row) -> Result<(Vec<Option<String>>, Option<String>)> {
    let canonical = CANONICAL_COLUMNS
        .iter()
        .map(|col| row.get(col).map(str::to_string))
        .collect();

    let extra: IndexMap<&str, &str> = row
        .iter()
        .filter(|(col, _)| !CANONICAL_COLUMNS.contains(col))
        .collect();
    let extra = if extra.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&extra)?)
    };

    Ok((canonical, extra))
}

fn from_record(record: MatrixRecord) -> Result<Row> {
    let (priority, risk, confidence, data, size, timing, recommendation, extra) = record;
    let cells = [priority, risk, confidence, data, size, timing, recommendation];

    let mut row = Row::new();
    for (col, cell) in CANONICAL_COLUMNS.iter().zip(cells) {
        if let Some(value) = cell {
            row.insert(*col, value);
        }
    }

    if let Some(extra) = extra.filter(|e| !e.is_empty()) {
        let extra: IndexMap<String, String> = serde_json::from_str(&extra)?;
        for (col, value) in extra {
            row.insert(col, value);
        }
    }

    Ok(row)
}

#[async_trait]
impl RemoteStore for SqlStore {
    fn describe(&self) -> String {
        "sqlite".to_string()
    }

    async fn probe(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM matrix_data")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn fetch_all(&self) -> Result<Table> {
        let records: Vec<MatrixRecord> = sqlx::query_as(
            r#"
            SELECT "Priority", "Risk", "Confidence", "Data", "Size", "Timing",
                   "Recommendation", extra
            FROM matrix_data
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        records.into_iter().map(from_record).collect()
    }

    async fn last_modified(&self) -> Result<Option<DateTime<Utc>>> {
        let value: Option<Option<String>> =
            sqlx::query_scalar("SELECT last_updated FROM matrix_metadata WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;
        Ok(value.flatten().and_then(|v| time::parse_iso(&v)))
    }

    async fn replace_all(&self, rows: &[Row], stamp: DateTime<Utc>) -> Result<()> {
        // Delete, insert and stamp commit together: readers never observe an
        // empty table between the delete and the inserts
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM matrix_data")
            .execute(&mut *tx)
            .await?;

        for (index, row) in rows.iter().enumerate() {
            let (cells, extra) = to_record(row)?;
            let mut query = sqlx::query(
                r#"
                INSERT INTO matrix_data
                    (id, "Priority", "Risk", "Confidence", "Data", "Size", "Timing",
                     "Recommendation", extra)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(index as i64 + 1);
            for cell in cells {
                query = query.bind(cell);
            }
            query.bind(extra).execute(&mut *tx).await?;
        }

        sqlx::query(
            r#"
            INSERT INTO matrix_metadata (id, last_updated) VALUES (1, ?)
            ON CONFLICT(id) DO UPDATE SET last_updated = excluded.last_updated
            "#,
        )
        .bind(time::to_iso(stamp))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!("Replaced remote matrix: {} rows", rows.len());
        Ok(())
    }
}

/// Stand-in used when no database is configured; every call is unavailable
#[derive(Debug, Clone, Default)]
pub struct UnconfiguredRemote;

impl UnconfiguredRemote {
    fn unavailable<T>() -> Result<T> {
        debug!("Remote store not configured");
        Err(Error::SourceUnavailable("remote store not configured".to_string()))
    }
}

#[async_trait]
impl RemoteStore for UnconfiguredRemote {
    fn describe(&self) -> String {
        "none".to_string()
    }

    async fn probe(&self) -> Result<u64> {
        Self::unavailable()
    }

    async fn fetch_all(&self) -> Result<Table> {
        Self::unavailable()
    }

    async fn last_modified(&self) -> Result<Option<DateTime<Utc>>> {
        Self::unavailable()
    }

    async fn replace_all(&self, _rows: &[Row], _stamp: DateTime<Utc>) -> Result<()> {
        Self::unavailable()
    }
}

/// SQL store opened on first use.
///
/// A database that cannot be opened yet is unavailable for that call only;
/// the next call tries again, so a store that comes back later is picked up
/// without a restart.
pub struct ReconnectingStore {
    url: String,
    store: OnceCell<SqlStore>,
}

impl ReconnectingStore {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            store: OnceCell::new(),
        }
    }

    /// The open store, connecting first if needed
    pub async fn connect(&self) -> Result<&SqlStore> {
        self.store
            .get_or_try_init(|| async {
                init_database_url(&self.url)
                    .await
                    .map(SqlStore::new)
                    .map_err(|e| Error::SourceUnavailable(format!("cannot open database: {e}")))
            })
            .await
    }

    pub fn is_connected(&self) -> bool {
        self.store.initialized()
    }
}

#[async_trait]
impl RemoteStore for ReconnectingStore {
    fn describe(&self) -> String {
        "sqlite".to_string()
    }

    async fn probe(&self) -> Result<u64> {
        self.connect().await?.probe().await
    }

    async fn fetch_all(&self) -> Result<Table> {
        self.connect().await?.fetch_all().await
    }

    async fn last_modified(&self) -> Result<Option<DateTime<Utc>>> {
        self.connect().await?.last_modified().await
    }

    async fn replace_all(&self, rows: &[Row], stamp: DateTime<Utc>) -> Result<()> {
        self.connect().await?.replace_all(rows, stamp).await
    }
}
