//! Report row access
//!
//! All report mutations go through here, and every mutation appends exactly
//! one change-log entry in the same transaction. The insert path re-derives
//! the road's coverage inside an IMMEDIATE transaction so two racing
//! submissions for overlapping segments cannot both be accepted.

use chrono::Utc;
use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;

use stormpath_common::coverage::RoadCoverage;
use stormpath_common::report::{Coverage, Report, ReportStatus};

use crate::db::changes::{self, ChangeType};
use crate::error::{Error, Result};
use crate::resolver::ReportDraft;

/// Result of the transactional check-and-reserve insert
#[derive(Debug)]
pub enum InsertOutcome {
    Inserted(Report),
    /// Lost a race: the draft's coverage conflicted with rows committed
    /// after the proposal was validated
    Conflict(String),
}

const SELECT_COLUMNS: &str = "id, road_id, road_name, coverage_kind, segment_ids, \
     segment_description, geometry, status, notes, timestamp, source_address";

type ReportRow = (
    String,         // id
    i64,            // road_id
    String,         // road_name
    String,         // coverage_kind
    Option<String>, // segment_ids (JSON)
    String,         // segment_description
    String,         // geometry (JSON)
    String,         // status
    Option<String>, // notes
    String,         // timestamp
    Option<String>, // source_address
);

fn report_from_row(row: ReportRow) -> Result<Report> {
    let (
        id,
        road_id,
        road_name,
        coverage_kind,
        segment_ids,
        segment_description,
        geometry,
        status,
        notes,
        timestamp,
        source_address,
    ) = row;

    let coverage = match coverage_kind.as_str() {
        "entire-road" => Coverage::EntireRoad,
        "segment-set" => Coverage::SegmentSet {
            segment_ids: serde_json::from_str(segment_ids.as_deref().unwrap_or("[]"))?,
        },
        other => {
            return Err(Error::Internal(format!(
                "Unknown coverage kind in row: {other}"
            )))
        }
    };

    Ok(Report {
        id: Uuid::parse_str(&id).map_err(|e| Error::Internal(format!("Bad report id: {e}")))?,
        road_id,
        road_name,
        coverage,
        segment_description,
        geometry: serde_json::from_str(&geometry)?,
        status: status.parse::<ReportStatus>()?,
        notes,
        timestamp: changes::parse_timestamp(&timestamp)?,
        source_address,
    })
}

/// All open reports, newest first
pub async fn list_reports(db: &SqlitePool) -> Result<Vec<Report>> {
    let rows = sqlx::query_as::<_, ReportRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM reports ORDER BY timestamp DESC"
    ))
    .fetch_all(db)
    .await?;
    rows.into_iter().map(report_from_row).collect()
}

/// One road's open reports
pub async fn reports_for_road<'e, E>(executor: E, road_id: i64) -> Result<Vec<Report>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, ReportRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM reports WHERE road_id = ? ORDER BY timestamp DESC"
    ))
    .bind(road_id)
    .fetch_all(executor)
    .await?;
    rows.into_iter().map(report_from_row).collect()
}

/// A single report by id, if it still exists
pub async fn get_report<'e, E>(executor: E, id: Uuid) -> Result<Option<Report>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, ReportRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM reports WHERE id = ?"
    ))
    .bind(id.to_string())
    .fetch_optional(executor)
    .await?;
    row.map(report_from_row).transpose()
}

/// Consistent snapshot of the full report set and the change-log position
/// it reflects. Used for the `init` sync event and the polling endpoint.
pub async fn snapshot(db: &SqlitePool) -> Result<(Vec<Report>, i64)> {
    let mut tx = db.begin().await?;

    let rows = sqlx::query_as::<_, ReportRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM reports ORDER BY timestamp DESC"
    ))
    .fetch_all(&mut *tx)
    .await?;
    let reports: Vec<Report> = rows
        .into_iter()
        .map(report_from_row)
        .collect::<Result<_>>()?;

    let last_change_id: Option<i64> =
        sqlx::query_scalar("SELECT MAX(change_id) FROM report_changes")
            .fetch_one(&mut *tx)
            .await?;

    tx.commit().await?;
    Ok((reports, last_change_id.unwrap_or(0)))
}

/// Atomic check-and-reserve: re-derive the road's coverage, verify the
/// draft still fits, insert, and append the `added` change entry, all in
/// one IMMEDIATE transaction.
pub async fn insert_report(db: &SqlitePool, draft: &ReportDraft) -> Result<InsertOutcome> {
    let mut conn = db.acquire().await?;
    sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

    match insert_in_tx(&mut *conn, draft).await {
        Ok(outcome) => {
            match outcome {
                InsertOutcome::Inserted(_) => {
                    sqlx::query("COMMIT").execute(&mut *conn).await?;
                }
                InsertOutcome::Conflict(_) => {
                    sqlx::query("ROLLBACK").execute(&mut *conn).await?;
                }
            }
            Ok(outcome)
        }
        Err(e) => {
            let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
            Err(e)
        }
    }
}

async fn insert_in_tx(conn: &mut SqliteConnection, draft: &ReportDraft) -> Result<InsertOutcome> {
    let existing = reports_for_road(&mut *conn, draft.road_id).await?;
    let coverage = RoadCoverage::from_reports(draft.road_id, &existing);
    if coverage.conflicts_with(&draft.coverage) {
        return Ok(InsertOutcome::Conflict(
            "Segments were claimed by another report".to_string(),
        ));
    }

    let report = Report {
        id: Uuid::new_v4(),
        road_id: draft.road_id,
        road_name: draft.road_name.clone(),
        coverage: draft.coverage.clone(),
        segment_description: draft.segment_description.clone(),
        geometry: draft.geometry.clone(),
        status: draft.status,
        notes: draft.notes.clone(),
        timestamp: Utc::now(),
        source_address: draft.source_address.clone(),
    };

    let (coverage_kind, segment_ids) = match &report.coverage {
        Coverage::EntireRoad => ("entire-road", None),
        Coverage::SegmentSet { segment_ids } => {
            ("segment-set", Some(serde_json::to_string(segment_ids)?))
        }
    };

    sqlx::query(
        "INSERT INTO reports (id, road_id, road_name, coverage_kind, segment_ids, \
         segment_description, geometry, status, notes, timestamp, source_address) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(report.id.to_string())
    .bind(report.road_id)
    .bind(&report.road_name)
    .bind(coverage_kind)
    .bind(segment_ids)
    .bind(&report.segment_description)
    .bind(serde_json::to_string(&report.geometry)?)
    .bind(report.status.as_str())
    .bind(&report.notes)
    .bind(report.timestamp.to_rfc3339())
    .bind(&report.source_address)
    .execute(&mut *conn)
    .await?;

    changes::append_change(conn, ChangeType::Added, report.id).await?;

    Ok(InsertOutcome::Inserted(report))
}

/// Privileged status change. Bumps the row timestamp and appends an
/// `updated` change entry; returns the updated row, or None if absent.
pub async fn update_status(
    db: &SqlitePool,
    id: Uuid,
    status: ReportStatus,
) -> Result<Option<Report>> {
    let mut tx = db.begin().await?;

    let result = sqlx::query("UPDATE reports SET status = ?, timestamp = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;
    if result.rows_affected() == 0 {
        return Ok(None);
    }

    changes::append_change(&mut *tx, ChangeType::Updated, id).await?;
    let report = get_report(&mut *tx, id).await?;
    tx.commit().await?;

    Ok(report)
}

/// Privileged delete. Appends a `deleted` change entry referencing the
/// now-gone row so connected viewers can drop it from local state.
pub async fn delete_report(db: &SqlitePool, id: Uuid) -> Result<bool> {
    let mut tx = db.begin().await?;

    let result = sqlx::query("DELETE FROM reports WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;
    if result.rows_affected() == 0 {
        return Ok(false);
    }

    changes::append_change(&mut *tx, ChangeType::Deleted, id).await?;
    tx.commit().await?;

    Ok(true)
}
