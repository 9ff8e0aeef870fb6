//! Report endpoints
//!
//! Submission goes through the conflict resolver and the transactional
//! insert path; a multi-run submission persists each run independently and
//! surfaces partial failure in the response rather than pretending
//! all-or-nothing.

use axum::extract::{ConnectInfo, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tracing::{error, info, warn};
use uuid::Uuid;

use stormpath_common::report::{Coverage, Report, ReportStatus};
use stormpath_common::road::Segment;

use crate::db::reports as db_reports;
use crate::db::reports::InsertOutcome;
use crate::resolver::{propose, Proposal, Rejection};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub road_id: i64,
    #[serde(flatten)]
    pub coverage: Coverage,
    pub status: ReportStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub success: bool,
    pub reports: Vec<Report>,
    pub failed: usize,
    pub total: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportsResponse {
    pub success: bool,
    pub reports: Vec<Report>,
    pub last_change_id: i64,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusChangeRequest {
    pub status: ReportStatus,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub success: bool,
    pub report: Report,
}

#[derive(Debug, Serialize)]
pub struct SegmentsResponse {
    pub success: bool,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            success: false,
            error: error.into(),
        }),
    )
}

fn internal_error(context: &str, e: crate::error::Error) -> ApiError {
    error!("{context}: {e}");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

/// GET /api/reports - current full report set with its log position
///
/// Serves the viewer polling fallback; the SSE `init` event carries the
/// same snapshot shape.
pub async fn list_reports(
    State(state): State<AppState>,
) -> Result<Json<ReportsResponse>, ApiError> {
    let (reports, last_change_id) = db_reports::snapshot(&state.db)
        .await
        .map_err(|e| internal_error("Failed to load reports", e))?;

    Ok(Json(ReportsResponse {
        success: true,
        reports,
        last_change_id,
    }))
}

/// POST /api/reports - submit a report
///
/// One accepted submission may persist several reports (one per contiguous
/// run); each run is independently transactional, so some may lose a race
/// after proposal time. The response carries the failure count out of the
/// total.
pub async fn submit_report(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Json(request): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let road = state
        .roads
        .road(request.road_id)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Unknown road"))?;
    let segments = state
        .roads
        .segments(request.road_id)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Unknown road"))?;

    let existing = db_reports::reports_for_road(&state.db, request.road_id)
        .await
        .map_err(|e| internal_error("Failed to load road reports", e))?;

    let source_address = connect_info.map(|ConnectInfo(addr)| addr.ip().to_string());

    let drafts = match propose(
        road,
        segments,
        &existing,
        &request.coverage,
        request.status,
        request.notes.clone(),
        source_address,
    ) {
        Proposal::Accepted(drafts) => drafts,
        Proposal::Rejected(Rejection::Validation(msg)) => {
            return Err(api_error(StatusCode::UNPROCESSABLE_ENTITY, msg));
        }
        Proposal::Rejected(Rejection::Conflict(msg)) => {
            return Err(api_error(StatusCode::CONFLICT, msg));
        }
    };

    let total = drafts.len();
    let mut accepted = Vec::with_capacity(total);
    let mut failed = 0usize;

    for draft in &drafts {
        match db_reports::insert_report(&state.db, draft).await {
            Ok(InsertOutcome::Inserted(report)) => accepted.push(report),
            Ok(InsertOutcome::Conflict(reason)) => {
                warn!(
                    "Report for road {} lost a race: {reason}",
                    request.road_id
                );
                failed += 1;
            }
            Err(e) => return Err(internal_error("Failed to insert report", e)),
        }
    }

    if accepted.is_empty() {
        return Err(api_error(
            StatusCode::CONFLICT,
            "Segments were claimed by another report",
        ));
    }

    info!(
        "Accepted {}/{} report(s) for road {} ({})",
        accepted.len(),
        total,
        road.id,
        road.name
    );

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            success: failed == 0,
            reports: accepted,
            failed,
            total,
        }),
    ))
}

/// PUT /api/reports/:id/status - privileged status change
pub async fn change_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<StatusChangeRequest>,
) -> Result<Json<ReportResponse>, ApiError> {
    match db_reports::update_status(&state.db, id, request.status).await {
        Ok(Some(report)) => {
            info!("Report {id} status changed to {}", request.status);
            Ok(Json(ReportResponse {
                success: true,
                report,
            }))
        }
        Ok(None) => Err(api_error(StatusCode::NOT_FOUND, "Report not found")),
        Err(e) => Err(internal_error("Failed to update report status", e)),
    }
}

/// DELETE /api/reports/:id - privileged delete
pub async fn delete_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StatusResponse>, ApiError> {
    match db_reports::delete_report(&state.db, id).await {
        Ok(true) => {
            info!("Report {id} deleted");
            Ok(Json(StatusResponse { success: true }))
        }
        Ok(false) => Err(api_error(StatusCode::NOT_FOUND, "Report not found")),
        Err(e) => Err(internal_error("Failed to delete report", e)),
    }
}

/// GET /api/roads/:id/segments - a road's derived segment list
pub async fn road_segments(
    State(state): State<AppState>,
    Path(road_id): Path<i64>,
) -> Result<Json<SegmentsResponse>, ApiError> {
    let segments = state
        .roads
        .segments(road_id)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Unknown road"))?;

    Ok(Json(SegmentsResponse {
        success: true,
        segments: segments.to_vec(),
    }))
}
