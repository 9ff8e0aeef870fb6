//! Report conflict resolution
//!
//! Validates a proposed report against a road's current coverage and splits
//! multi-segment selections into one report per contiguous run. The
//! decision here is advisory: the database insert re-derives coverage inside
//! its transaction, so a proposal that raced a competing submission fails
//! per-draft there rather than double-accepting.

use stormpath_common::coverage::RoadCoverage;
use stormpath_common::geo::Point;
use stormpath_common::grouping::{combine_run, group_contiguous, sort_segment_ids};
use stormpath_common::report::{Coverage, Report, ReportStatus};
use stormpath_common::road::{Road, Segment};
use stormpath_common::validate::validate_notes;

/// Fields of a report to be created; id and timestamp are assigned at
/// insert time.
#[derive(Debug, Clone)]
pub struct ReportDraft {
    pub road_id: i64,
    pub road_name: String,
    pub coverage: Coverage,
    pub segment_description: String,
    pub geometry: Vec<Point>,
    pub status: ReportStatus,
    pub notes: Option<String>,
    pub source_address: Option<String>,
}

/// Why a submission was rejected outright
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Notes or coverage shape failed validation; nothing was checked
    /// against existing reports
    Validation(String),
    /// The requested span overlaps existing coverage
    Conflict(String),
}

impl Rejection {
    pub fn message(&self) -> &str {
        match self {
            Rejection::Validation(msg) | Rejection::Conflict(msg) => msg,
        }
    }
}

/// Resolution outcome: report-creation commands, or a rejection
#[derive(Debug, Clone)]
pub enum Proposal {
    Accepted(Vec<ReportDraft>),
    Rejected(Rejection),
}

/// Validate a submission and turn it into report drafts.
///
/// `existing` is the road's current open reports. Segment-set requests are
/// split into one draft per contiguous run; this is the only path that
/// produces more than one report from a single user action.
pub fn propose(
    road: &Road,
    segments: &[Segment],
    existing: &[Report],
    requested: &Coverage,
    status: ReportStatus,
    notes: Option<String>,
    source_address: Option<String>,
) -> Proposal {
    if let Some(text) = notes.as_deref() {
        if let Err(rejection) = validate_notes(text) {
            return Proposal::Rejected(Rejection::Validation(rejection.message().to_string()));
        }
    }

    let coverage = RoadCoverage::from_reports(road.id, existing);

    let drafts = match requested {
        Coverage::EntireRoad => {
            if !coverage.is_empty() {
                return Proposal::Rejected(Rejection::Conflict(
                    "This road already has existing reports on specific segments. \
                     Please report individual segments instead."
                        .to_string(),
                ));
            }
            vec![ReportDraft {
                road_id: road.id,
                road_name: road.name.clone(),
                coverage: Coverage::EntireRoad,
                segment_description: "Entire road".to_string(),
                geometry: road.geometry.clone(),
                status,
                notes: notes.clone(),
                source_address: source_address.clone(),
            }]
        }
        Coverage::SegmentSet { segment_ids } => {
            if segment_ids.is_empty() {
                return Proposal::Rejected(Rejection::Validation(
                    "No segments selected".to_string(),
                ));
            }
            if let Some(unknown) = segment_ids
                .iter()
                .find(|id| !segments.iter().any(|s| &s.id == *id))
            {
                return Proposal::Rejected(Rejection::Validation(format!(
                    "Unknown segment for this road: {unknown}"
                )));
            }
            if coverage.conflicts_with(requested) {
                return Proposal::Rejected(Rejection::Conflict(
                    "One or more of these segments already have reports. \
                     Please update or delete the existing report first."
                        .to_string(),
                ));
            }

            let sorted = sort_segment_ids(segment_ids);
            group_contiguous(&sorted)
                .iter()
                .map(|run| {
                    let span = combine_run(run, segments);
                    ReportDraft {
                        road_id: road.id,
                        road_name: road.name.clone(),
                        coverage: Coverage::SegmentSet {
                            segment_ids: span.segment_ids,
                        },
                        segment_description: span.description,
                        geometry: span.geometry,
                        status,
                        notes: notes.clone(),
                        source_address: source_address.clone(),
                    }
                })
                .collect()
        }
    };

    Proposal::Accepted(drafts)
}
