//! Per-road coverage index
//!
//! Derived view over one road's open reports: which segment ids are claimed,
//! and whether a whole-road claim exists. Always rebuilt from the current
//! report set, never patched incrementally, so it cannot drift; holders
//! treat it as disposable.

use std::collections::HashSet;

use crate::report::{Coverage, Report};

/// Segment ids currently covered by open reports on one road
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoadCoverage {
    pub entire_road: bool,
    pub segment_ids: HashSet<String>,
}

impl RoadCoverage {
    /// Full rebuild from the given reports; entries for other roads are
    /// ignored so callers can pass an unfiltered set.
    pub fn from_reports<'a>(road_id: i64, reports: impl IntoIterator<Item = &'a Report>) -> Self {
        let mut coverage = RoadCoverage::default();
        for report in reports {
            if report.road_id != road_id {
                continue;
            }
            match &report.coverage {
                Coverage::EntireRoad => coverage.entire_road = true,
                Coverage::SegmentSet { segment_ids } => {
                    coverage.segment_ids.extend(segment_ids.iter().cloned());
                }
            }
        }
        coverage
    }

    /// True when no report covers any part of the road
    pub fn is_empty(&self) -> bool {
        !self.entire_road && self.segment_ids.is_empty()
    }

    /// Would the requested coverage overlap what is already claimed?
    ///
    /// Whole-road claims are exclusive in both directions: they conflict
    /// with any existing report, and any existing whole-road claim conflicts
    /// with everything.
    pub fn conflicts_with(&self, requested: &Coverage) -> bool {
        match requested {
            Coverage::EntireRoad => !self.is_empty(),
            Coverage::SegmentSet { segment_ids } => {
                self.entire_road || segment_ids.iter().any(|id| self.segment_ids.contains(id))
            }
        }
    }
}
