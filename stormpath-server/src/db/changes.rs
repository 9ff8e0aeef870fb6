//! Change log access
//!
//! The append-only record of report mutations. `change_id` is monotonically
//! increasing and is the single ordering authority for viewer sync; entries
//! are never mutated. A delete entry outlives the report row it references.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Kind of report mutation recorded in the log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    Added,
    Updated,
    Deleted,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Added => "added",
            ChangeType::Updated => "updated",
            ChangeType::Deleted => "deleted",
        }
    }

    fn parse(s: &str) -> Result<Self> {
        match s {
            "added" => Ok(ChangeType::Added),
            "updated" => Ok(ChangeType::Updated),
            "deleted" => Ok(ChangeType::Deleted),
            other => Err(Error::Internal(format!("Unknown change type in log: {other}"))),
        }
    }
}

/// One appended mutation record
#[derive(Debug, Clone)]
pub struct ChangeLogEntry {
    pub change_id: i64,
    pub change_type: ChangeType,
    pub report_id: Uuid,
    pub occurred_at: DateTime<Utc>,
}

/// Append one entry. Must run on the same connection (transaction) as the
/// report write it records, so the two are committed together.
pub async fn append_change(
    conn: &mut SqliteConnection,
    change_type: ChangeType,
    report_id: Uuid,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO report_changes (change_type, report_id, occurred_at) VALUES (?, ?, ?)",
    )
    .bind(change_type.as_str())
    .bind(report_id.to_string())
    .bind(Utc::now().to_rfc3339())
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Entries with `change_id` greater than the given watermark, in order.
pub async fn read_changes_since(db: &SqlitePool, change_id: i64) -> Result<Vec<ChangeLogEntry>> {
    let rows = sqlx::query_as::<_, (i64, String, String, String)>(
        "SELECT change_id, change_type, report_id, occurred_at
         FROM report_changes WHERE change_id > ? ORDER BY change_id ASC",
    )
    .bind(change_id)
    .fetch_all(db)
    .await?;

    rows.into_iter()
        .map(|(change_id, change_type, report_id, occurred_at)| {
            Ok(ChangeLogEntry {
                change_id,
                change_type: ChangeType::parse(&change_type)?,
                report_id: Uuid::parse_str(&report_id)
                    .map_err(|e| Error::Internal(format!("Bad report id in log: {e}")))?,
                occurred_at: parse_timestamp(&occurred_at)?,
            })
        })
        .collect()
}

/// Current tail position of the log (0 when empty)
pub async fn latest_change_id(db: &SqlitePool) -> Result<i64> {
    let max: Option<i64> = sqlx::query_scalar("SELECT MAX(change_id) FROM report_changes")
        .fetch_one(db)
        .await?;
    Ok(max.unwrap_or(0))
}

/// Drop log entries older than the cutoff. Retention is an operational
/// choice; the cutoff must predate every connected viewer's watermark.
pub async fn prune_changes_before(db: &SqlitePool, cutoff: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query("DELETE FROM report_changes WHERE occurred_at < ?")
        .bind(cutoff.to_rfc3339())
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Bad timestamp in row: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::create_schema;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory database");
        create_schema(&pool).await.expect("schema");
        pool
    }

    #[tokio::test]
    async fn append_is_monotonic_and_read_in_order() {
        let db = memory_db().await;
        let id = Uuid::new_v4();

        let mut conn = db.acquire().await.unwrap();
        let first = append_change(&mut *conn, ChangeType::Added, id).await.unwrap();
        let second = append_change(&mut *conn, ChangeType::Updated, id).await.unwrap();
        let third = append_change(&mut *conn, ChangeType::Deleted, id).await.unwrap();
        drop(conn);

        assert!(first < second && second < third);
        assert_eq!(latest_change_id(&db).await.unwrap(), third);

        let entries = read_changes_since(&db, first).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].change_id, second);
        assert_eq!(entries[0].change_type, ChangeType::Updated);
        assert_eq!(entries[1].change_type, ChangeType::Deleted);
        assert_eq!(entries[1].report_id, id);
    }

    #[tokio::test]
    async fn empty_log_reads_empty() {
        let db = memory_db().await;
        assert_eq!(latest_change_id(&db).await.unwrap(), 0);
        assert!(read_changes_since(&db, 0).await.unwrap().is_empty());
    }
}
