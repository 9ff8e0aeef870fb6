//! Road and segment model
//!
//! Roads come from the offline road-data build (Overpass-derived JSON).
//! Segments are always derived at runtime by the segmenter so that segment
//! ids stay stable against exactly one algorithm; any pre-computed segment
//! data in the road file is ignored.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geo::Point;

/// A named road with its full polyline geometry. Immutable within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Road {
    pub id: i64,
    pub name: String,
    pub geometry: Vec<Point>,
}

/// An addressable sub-span of a road, derived by the segmenter.
///
/// `id` is `"{roadId}-{index}"` with a 1-based index. Neighboring segments
/// share their boundary point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub id: String,
    pub road_id: i64,
    pub description: String,
    pub geometry: Vec<Point>,
}

/// Numeric suffix of a segment id (`"292422956-3"` -> 3)
pub fn segment_index(segment_id: &str) -> Option<u32> {
    segment_id.rsplit('-').next()?.parse().ok()
}

/// One road record in the build output. Unknown fields (including any
/// pre-computed `segments`) are dropped.
#[derive(Debug, Deserialize)]
struct RoadRecord {
    id: i64,
    #[serde(default)]
    tags: RoadTags,
    #[serde(default)]
    geometry: Vec<Point>,
}

#[derive(Debug, Default, Deserialize)]
struct RoadTags {
    #[serde(default)]
    name: Option<String>,
}

impl From<RoadRecord> for Road {
    fn from(record: RoadRecord) -> Self {
        Road {
            id: record.id,
            name: record.tags.name.unwrap_or_else(|| "Unnamed Road".to_string()),
            geometry: record.geometry,
        }
    }
}

/// Full-payload road file: `{ "elements": [ ... ] }`
#[derive(Debug, Deserialize)]
struct RoadFileEnvelope {
    elements: Vec<RoadRecord>,
}

/// Load roads from a build artifact.
///
/// `.jsonl` files hold one road record per line (the streaming format);
/// anything else is parsed as the full `{ "elements": [...] }` payload.
/// Records with fewer than two points are skipped.
pub fn load_roads(path: &Path) -> Result<Vec<Road>> {
    let is_jsonl = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("jsonl"))
        .unwrap_or(false);

    let records: Vec<RoadRecord> = if is_jsonl {
        let reader = BufReader::new(File::open(path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        records
    } else {
        let reader = BufReader::new(File::open(path)?);
        let envelope: RoadFileEnvelope = serde_json::from_reader(reader)?;
        envelope.elements
    };

    if records.is_empty() {
        return Err(Error::Config(format!(
            "No road records in {}",
            path.display()
        )));
    }

    Ok(records
        .into_iter()
        .map(Road::from)
        .filter(|road| road.geometry.len() >= 2)
        .collect())
}
