//! Database initialization
//!
//! Creates the database on first run and applies the schema idempotently.

use std::path::Path;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::Result;

/// Initialize the database connection pool, creating the file and schema
/// if needed.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL allows concurrent viewer-stream readers with one writer
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create tables and indexes. Idempotent, safe to call on every startup.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reports (
            id TEXT PRIMARY KEY,
            road_id INTEGER NOT NULL,
            road_name TEXT NOT NULL,
            coverage_kind TEXT NOT NULL,
            segment_ids TEXT,
            segment_description TEXT NOT NULL,
            geometry TEXT NOT NULL,
            status TEXT NOT NULL,
            notes TEXT,
            timestamp TEXT NOT NULL,
            source_address TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_reports_road_id ON reports(road_id)")
        .execute(pool)
        .await?;

    // Append-only mutation log; change_id is the sync ordering authority
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS report_changes (
            change_id INTEGER PRIMARY KEY AUTOINCREMENT,
            change_type TEXT NOT NULL,
            report_id TEXT NOT NULL,
            occurred_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
