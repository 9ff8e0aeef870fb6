//! Report data model
//!
//! A report claims a span of one road (the whole road or a set of segment
//! ids) with a condition status. Reports are the unit of persisted state;
//! everything else (coverage, rendering) is derived from them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;
use crate::geo::Point;

/// Road condition reported for a span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportStatus {
    Clear,
    Snow,
    Ice,
    BlockedTree,
    BlockedPower,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Clear => "clear",
            ReportStatus::Snow => "snow",
            ReportStatus::Ice => "ice",
            ReportStatus::BlockedTree => "blocked-tree",
            ReportStatus::BlockedPower => "blocked-power",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clear" => Ok(ReportStatus::Clear),
            "snow" => Ok(ReportStatus::Snow),
            "ice" => Ok(ReportStatus::Ice),
            "blocked-tree" => Ok(ReportStatus::BlockedTree),
            "blocked-power" => Ok(ReportStatus::BlockedPower),
            other => Err(Error::InvalidInput(format!("Unknown status: {other}"))),
        }
    }
}

/// What span of the road a report claims.
///
/// Exactly two shapes exist: the exclusive whole-road claim, and a set of
/// segment ids. On the wire this flattens into the report as a `kind`
/// discriminator plus `segmentIds` for the segment-set case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Coverage {
    EntireRoad,
    #[serde(rename_all = "camelCase")]
    SegmentSet { segment_ids: Vec<String> },
}

impl Coverage {
    pub fn segment_set(ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Coverage::SegmentSet {
            segment_ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// The claimed segment ids, or None for a whole-road claim
    pub fn segment_ids(&self) -> Option<&[String]> {
        match self {
            Coverage::EntireRoad => None,
            Coverage::SegmentSet { segment_ids } => Some(segment_ids),
        }
    }

    pub fn is_entire_road(&self) -> bool {
        matches!(self, Coverage::EntireRoad)
    }
}

/// A persisted road condition report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    pub road_id: i64,
    /// Road name denormalized at write time
    pub road_name: String,
    #[serde(flatten)]
    pub coverage: Coverage,
    /// Human label for the covered span
    pub segment_description: String,
    /// Covered span's line, for map rendering
    pub geometry: Vec<Point>,
    pub status: ReportStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Reporter's network origin; never serialized to viewers
    #[serde(skip)]
    pub source_address: Option<String>,
}
