//! Road catalog
//!
//! Roads loaded once at startup from the offline road-data build, with each
//! road's segment list derived eagerly. Roads are immutable for the life of
//! the process; a data rebuild means a restart.

use std::collections::HashMap;
use std::path::Path;

use tracing::info;

use stormpath_common::road::{load_roads, Road, Segment};
use stormpath_common::segmenter::segment_road;

use crate::error::Result;

struct CatalogEntry {
    road: Road,
    segments: Vec<Segment>,
}

/// Lookup table of all known roads and their derived segments
pub struct RoadCatalog {
    entries: HashMap<i64, CatalogEntry>,
}

impl RoadCatalog {
    /// Load the catalog from a roads file (`.json` envelope or `.jsonl`)
    pub fn load(path: &Path) -> Result<Self> {
        let roads = load_roads(path)?;
        info!("Loaded {} roads from {}", roads.len(), path.display());
        Ok(Self::from_roads(roads))
    }

    pub fn from_roads(roads: Vec<Road>) -> Self {
        let entries = roads
            .into_iter()
            .map(|road| {
                let segments = segment_road(&road);
                (road.id, CatalogEntry { road, segments })
            })
            .collect();
        RoadCatalog { entries }
    }

    pub fn road(&self, id: i64) -> Option<&Road> {
        self.entries.get(&id).map(|entry| &entry.road)
    }

    pub fn segments(&self, road_id: i64) -> Option<&[Segment]> {
        self.entries.get(&road_id).map(|entry| entry.segments.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stormpath_common::geo::Point;

    #[test]
    fn catalog_derives_segments_per_road() {
        let roads = vec![
            Road {
                id: 1,
                name: "Short Lane".to_string(),
                geometry: vec![Point(45.0, -71.0), Point(45.01, -71.0)],
            },
            Road {
                id: 2,
                name: "Long Road".to_string(),
                geometry: (0..20)
                    .map(|i| Point(45.0 + i as f64 * (6.4 / 19.0 / 111.19), -71.0))
                    .collect(),
            },
        ];

        let catalog = RoadCatalog::from_roads(roads);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.segments(1).unwrap().len(), 1);
        assert_eq!(catalog.segments(2).unwrap().len(), 2);
        assert_eq!(catalog.road(2).unwrap().name, "Long Road");
        assert!(catalog.road(99).is_none());
        assert!(catalog.segments(99).is_none());
    }
}
