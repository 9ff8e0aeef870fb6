//! Local report reconciler
//!
//! Replica of the server's report set, updated from `init` snapshots and
//! deltas. Every apply is idempotent: duplicate delivery and re-ordered
//! duplicates must never corrupt state or raise. Per-road coverage is
//! recomputed wholesale for affected roads only, so callers re-render just
//! those roads.

use std::collections::{BTreeSet, HashMap, HashSet};

use uuid::Uuid;

use stormpath_common::coverage::RoadCoverage;
use stormpath_common::events::SyncEvent;
use stormpath_common::report::Report;

/// Which roads an apply touched; callers re-render exactly these.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Applied {
    pub affected_roads: BTreeSet<i64>,
}

impl Applied {
    fn one(road_id: i64) -> Self {
        Applied {
            affected_roads: BTreeSet::from([road_id]),
        }
    }
}

/// Viewer-side replica of the report set
#[derive(Debug, Default)]
pub struct ViewerState {
    reports: HashMap<Uuid, Report>,
    /// Optimistically inserted rows awaiting their authoritative delta
    speculative: HashSet<Uuid>,
    coverage: HashMap<i64, RoadCoverage>,
    last_change_id: i64,
    initialized: bool,
}

impl ViewerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once a snapshot (stream `init` or fallback poll) has landed
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Last change-log position observed
    pub fn last_change_id(&self) -> i64 {
        self.last_change_id
    }

    pub fn reports(&self) -> impl Iterator<Item = &Report> {
        self.reports.values()
    }

    pub fn report(&self, id: Uuid) -> Option<&Report> {
        self.reports.get(&id)
    }

    /// True while a locally inserted report has not yet been confirmed by
    /// its authoritative delta
    pub fn is_speculative(&self, id: Uuid) -> bool {
        self.speculative.contains(&id)
    }

    /// Current coverage for a road; empty when it has no reports
    pub fn coverage_for(&self, road_id: i64) -> RoadCoverage {
        self.coverage.get(&road_id).cloned().unwrap_or_default()
    }

    /// Apply any sync event. `init` replaces state wholesale; deltas apply
    /// incrementally.
    pub fn apply(&mut self, event: SyncEvent) -> Applied {
        match event {
            SyncEvent::Init {
                reports,
                last_change_id,
            } => self.apply_init(reports, last_change_id),
            delta => self.apply_delta(&delta),
        }
    }

    /// Wholesale replacement from a snapshot. Every road referenced before
    /// or after is affected (rendering must drop stale overlays too).
    pub fn apply_init(&mut self, reports: Vec<Report>, last_change_id: i64) -> Applied {
        let mut affected: BTreeSet<i64> = self.reports.values().map(|r| r.road_id).collect();

        self.reports = reports.into_iter().map(|r| (r.id, r)).collect();
        self.speculative.clear();
        self.last_change_id = last_change_id;
        self.initialized = true;

        affected.extend(self.reports.values().map(|r| r.road_id));
        for &road_id in &affected {
            self.rebuild_coverage(road_id);
        }

        Applied {
            affected_roads: affected,
        }
    }

    /// Apply one delta idempotently.
    ///
    /// Upserts by report id (an unchanged upsert is a harmless no-op);
    /// deleting an absent id is a no-op, not an error. The watermark only
    /// moves forward.
    pub fn apply_delta(&mut self, event: &SyncEvent) -> Applied {
        let applied = match event {
            SyncEvent::Init { .. } => Applied::default(),
            SyncEvent::ReportAdded { report, .. } | SyncEvent::ReportUpdated { report, .. } => {
                self.speculative.remove(&report.id);
                let mut affected = Applied::one(report.road_id);
                if let Some(previous) = self.reports.insert(report.id, report.clone()) {
                    // A moved report dirties its old road as well
                    affected.affected_roads.insert(previous.road_id);
                }
                for &road_id in &affected.affected_roads {
                    self.rebuild_coverage(road_id);
                }
                affected
            }
            SyncEvent::ReportDeleted { report_id, .. } => {
                self.speculative.remove(report_id);
                match self.reports.remove(report_id) {
                    Some(removed) => {
                        self.rebuild_coverage(removed.road_id);
                        Applied::one(removed.road_id)
                    }
                    None => Applied::default(),
                }
            }
        };

        self.last_change_id = self.last_change_id.max(event.change_id());
        applied
    }

    /// Optimistic local insert of a just-submitted report. The authoritative
    /// `report_added` delta for the same id replaces it rather than
    /// duplicating.
    pub fn insert_speculative(&mut self, report: Report) -> Applied {
        let road_id = report.road_id;
        self.speculative.insert(report.id);
        self.reports.insert(report.id, report);
        self.rebuild_coverage(road_id);
        Applied::one(road_id)
    }

    fn rebuild_coverage(&mut self, road_id: i64) {
        let coverage = RoadCoverage::from_reports(road_id, self.reports.values());
        if coverage.is_empty() {
            self.coverage.remove(&road_id);
        } else {
            self.coverage.insert(road_id, coverage);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stormpath_common::geo::Point;
    use stormpath_common::report::{Coverage, ReportStatus};

    fn report(road_id: i64, coverage: Coverage) -> Report {
        Report {
            id: Uuid::new_v4(),
            road_id,
            road_name: format!("Road {road_id}"),
            coverage,
            segment_description: "span".to_string(),
            geometry: vec![Point(45.0, -71.0), Point(45.01, -71.0)],
            status: ReportStatus::Snow,
            notes: None,
            timestamp: Utc::now(),
            source_address: None,
        }
    }

    #[test]
    fn init_replaces_state_wholesale() {
        let mut state = ViewerState::new();
        let stale = report(7, Coverage::EntireRoad);
        state.apply_init(vec![stale.clone()], 3);

        let fresh = report(8, Coverage::segment_set(["8-1"]));
        let applied = state.apply_init(vec![fresh.clone()], 9);

        // Both the dropped road and the new one need re-rendering
        assert_eq!(applied.affected_roads, BTreeSet::from([7, 8]));
        assert_eq!(state.last_change_id(), 9);
        assert!(state.report(stale.id).is_none());
        assert!(state.report(fresh.id).is_some());
        assert!(state.coverage_for(7).is_empty());
        assert!(state.coverage_for(8).segment_ids.contains("8-1"));
    }

    #[test]
    fn duplicate_delete_is_idempotent() {
        let mut state = ViewerState::new();
        let r = report(5, Coverage::segment_set(["5-2"]));
        state.apply_init(vec![r.clone()], 1);

        let delete = SyncEvent::ReportDeleted {
            report_id: r.id,
            change_id: 2,
        };
        let first = state.apply_delta(&delete);
        assert_eq!(first.affected_roads, BTreeSet::from([5]));
        assert!(state.coverage_for(5).is_empty());

        let second = state.apply_delta(&delete);
        assert_eq!(second, Applied::default());
        assert_eq!(state.reports().count(), 0);
        assert_eq!(state.last_change_id(), 2);
    }

    #[test]
    fn init_then_deltas_matches_authoritative_set() {
        let mut state = ViewerState::new();
        let a = report(1, Coverage::segment_set(["1-1"]));
        let b = report(2, Coverage::EntireRoad);
        state.apply_init(vec![a.clone()], 10);

        state.apply_delta(&SyncEvent::ReportAdded {
            report: b.clone(),
            change_id: 11,
        });
        let mut a_updated = a.clone();
        a_updated.status = ReportStatus::Clear;
        state.apply_delta(&SyncEvent::ReportUpdated {
            report: a_updated.clone(),
            change_id: 12,
        });
        state.apply_delta(&SyncEvent::ReportDeleted {
            report_id: b.id,
            change_id: 13,
        });

        assert_eq!(state.last_change_id(), 13);
        let remaining: Vec<&Report> = state.reports().collect();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0], &a_updated);
        assert!(state.coverage_for(2).is_empty());
    }

    #[test]
    fn duplicate_and_stale_deliveries_are_harmless() {
        let mut state = ViewerState::new();
        state.apply_init(Vec::new(), 5);

        let r = report(3, Coverage::segment_set(["3-1"]));
        let added = SyncEvent::ReportAdded {
            report: r.clone(),
            change_id: 6,
        };
        state.apply_delta(&added);
        // At-least-once delivery: the same delta again is a no-op upsert
        state.apply_delta(&added);

        assert_eq!(state.reports().count(), 1);
        assert_eq!(state.last_change_id(), 6);

        // A stale duplicate with a lower change id never rewinds the
        // watermark
        let stale = SyncEvent::ReportUpdated {
            report: r.clone(),
            change_id: 4,
        };
        state.apply_delta(&stale);
        assert_eq!(state.last_change_id(), 6);
    }

    #[test]
    fn speculative_insert_is_replaced_not_duplicated() {
        let mut state = ViewerState::new();
        state.apply_init(Vec::new(), 1);

        let submitted = report(4, Coverage::segment_set(["4-1"]));
        state.insert_speculative(submitted.clone());
        assert!(state.is_speculative(submitted.id));
        assert!(state.coverage_for(4).segment_ids.contains("4-1"));

        // The authoritative delta for the same id confirms it in place
        state.apply_delta(&SyncEvent::ReportAdded {
            report: submitted.clone(),
            change_id: 2,
        });
        assert!(!state.is_speculative(submitted.id));
        assert_eq!(state.reports().count(), 1);
    }

    #[test]
    fn moved_report_dirties_both_roads() {
        let mut state = ViewerState::new();
        let mut r = report(1, Coverage::segment_set(["1-1"]));
        state.apply_init(vec![r.clone()], 1);

        r.road_id = 2;
        r.coverage = Coverage::segment_set(["2-1"]);
        let applied = state.apply_delta(&SyncEvent::ReportUpdated {
            report: r,
            change_id: 2,
        });

        assert_eq!(applied.affected_roads, BTreeSet::from([1, 2]));
        assert!(state.coverage_for(1).is_empty());
        assert!(state.coverage_for(2).segment_ids.contains("2-1"));
    }
}
