//! Database access layer for smeta-brain
//!
//! Consensus items and raw records live in SQLite. Analyses and source file
//! sets are stored as JSON text columns.

use smeta_common::Result;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod items;
pub mod raw_records;

/// How long a connection waits on another writer before failing with SQLITE_BUSY
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Pool size for file-backed databases
const MAX_CONNECTIONS: u32 = 8;

/// Open (creating if needed) the brain database and ensure the schema
pub async fn connect(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // WAL lets readers proceed while one writer holds the lock; busy_timeout
    // makes competing writers queue instead of failing immediately
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .busy_timeout(BUSY_TIMEOUT)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await?;
    init_schema(&pool).await?;

    info!(
        "Database ready: {} ({} connections, busy_timeout={}ms)",
        db_path.display(),
        MAX_CONNECTIONS,
        BUSY_TIMEOUT.as_millis()
    );
    Ok(pool)
}

/// Open a write transaction
///
/// Takes the database write lock up front (`BEGIN IMMEDIATE`). A deferred
/// transaction that reads first and writes later cannot wait for the lock:
/// SQLite fails the upgrade with SQLITE_BUSY as soon as another writer is active.
pub async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

/// In-memory database with the schema applied
///
/// Limited to a single connection that never expires: every SQLite
/// in-memory connection is its own database.
pub async fn connect_in_memory() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None::<Duration>)
        .max_lifetime(None::<Duration>)
        .connect("sqlite::memory:")
        .await?;
    init_schema(&pool).await?;
    Ok(pool)
}

/// Round trip to the database
pub async fn ping(pool: &SqlitePool) -> Result<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Create tables if they do not exist
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS consensus_items (
            guid TEXT PRIMARY KEY,
            position INTEGER NOT NULL,
            name TEXT NOT NULL,
            unit TEXT NOT NULL DEFAULT '',
            material_price REAL NOT NULL DEFAULT 0,
            work_price REAL NOT NULL DEFAULT 0,
            material_analysis TEXT NOT NULL,
            work_analysis TEXT NOT NULL,
            material_price_approved INTEGER NOT NULL DEFAULT 0,
            work_price_approved INTEGER NOT NULL DEFAULT 0,
            cluster_size INTEGER NOT NULL DEFAULT 1,
            source_files TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS raw_records (
            guid TEXT PRIMARY KEY,
            position INTEGER NOT NULL,
            name TEXT NOT NULL,
            unit TEXT NOT NULL DEFAULT '',
            material_price REAL NOT NULL DEFAULT 0,
            work_price REAL NOT NULL DEFAULT 0,
            source_file TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Parse an RFC 3339 timestamp column
pub(crate) fn parse_timestamp(value: &str) -> Result<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| smeta_common::Error::Internal(format!("Failed to parse timestamp '{}': {}", value, e)))
}

/// Parse a guid column
pub(crate) fn parse_guid(value: &str) -> Result<uuid::Uuid> {
    uuid::Uuid::parse_str(value)
        .map_err(|e| smeta_common::Error::Internal(format!("Invalid guid '{}': {}", value, e)))
}
