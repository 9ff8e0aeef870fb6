//! Road polyline segmentation
//!
//! Splits a road's geometry into independently reportable spans with stable
//! ids of the form `"{roadId}-{index}"`. Intersections are approximated by
//! bearing changes along the polyline; roads with no detectable turns fall
//! back to distance-based splitting. Output is capped at three segments per
//! road.
//!
//! Open reports address segments by id, so the thresholds and caps here must
//! not change without migrating stored coverage: identical geometry must
//! always produce identical ids and boundaries.

use crate::geo::{bearing_deg, haversine_km, Point};
use crate::road::{Road, Segment};

/// Roads with fewer points than this are not split at all.
const MIN_POINTS_FOR_SPLIT: usize = 15;

/// Bearing deltas in this open interval count as a turn: below is
/// "basically straight", above is a U-turn artifact.
const MIN_TURN_DEG: f64 = 30.0;
const MAX_TURN_DEG: f64 = 150.0;

/// Turn candidates closer than this to the previously accepted one are
/// discarded.
const MIN_CANDIDATE_SPACING_KM: f64 = 0.2;

/// Distance-based fallback cuts roughly every 2 miles.
const MAX_SEGMENT_LENGTH_KM: f64 = 3.2;

/// At most 2 cuts either way, so at most 3 segments per road.
const MAX_CUTS: usize = 2;

const WHOLE_ROAD_LABEL: &str = "All visible segments";

/// Decompose a road into its ordered, deterministic segment list.
///
/// Always returns at least one segment; degenerate geometry (under two
/// points, NaN coordinates) yields the trivial whole-road segment.
pub fn segment_road(road: &Road) -> Vec<Segment> {
    let geometry = &road.geometry;

    if geometry.len() < MIN_POINTS_FOR_SPLIT || geometry.iter().any(|p| !p.is_finite()) {
        return finalize(road, vec![geometry.clone()]);
    }

    let cuts = find_turn_candidates(geometry);
    let parts = if cuts.is_empty() {
        split_by_distance(geometry)
    } else {
        split_at_indices(geometry, &cuts)
    };

    finalize(road, parts)
}

/// Scan interior points for bearing changes that look like intersections.
///
/// Compares the bearing over points `i-2 -> i` against `i -> i+2`; the
/// two-point lookahead smooths over jittery vertices. Returns at most
/// `MAX_CUTS` indices, evenly spaced among the candidates when more
/// survive the spacing filter.
fn find_turn_candidates(geometry: &[Point]) -> Vec<usize> {
    let mut candidates: Vec<usize> = Vec::new();

    for i in 2..geometry.len() - 2 {
        let prev = geometry[i - 2];
        let curr = geometry[i];
        let next = geometry[i + 2];

        // Zero-length sub-vectors (duplicate points) have no bearing; skip.
        if prev == curr || curr == next {
            continue;
        }

        let delta = (bearing_deg(curr, next) - bearing_deg(prev, curr)).abs();
        if delta <= MIN_TURN_DEG || delta >= MAX_TURN_DEG {
            continue;
        }

        match candidates.last() {
            Some(&last) if haversine_km(geometry[last], curr) <= MIN_CANDIDATE_SPACING_KM => {}
            _ => candidates.push(i),
        }
    }

    if candidates.len() > MAX_CUTS {
        let step = candidates.len() / 2;
        let mut kept = vec![candidates[step], candidates[candidates.len() - step]];
        kept.sort_unstable();
        kept.dedup();
        return kept;
    }

    candidates
}

/// Split at the given indices; each split point belongs to both neighbors.
fn split_at_indices(geometry: &[Point], cuts: &[usize]) -> Vec<Vec<Point>> {
    let mut parts = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0;

    for &cut in cuts {
        parts.push(geometry[start..=cut].to_vec());
        start = cut;
    }
    parts.push(geometry[start..].to_vec());

    parts
}

/// Fallback splitting by accumulated great-circle distance.
///
/// Cuts once ~3.2 km have accumulated, until the cut cap is reached; any
/// remaining points attach to the final segment. A trailing single-point
/// remainder is dropped, since that point already ends the previous part.
fn split_by_distance(geometry: &[Point]) -> Vec<Vec<Point>> {
    let mut parts: Vec<Vec<Point>> = Vec::new();
    let mut current = vec![geometry[0]];
    let mut travelled = 0.0;

    for i in 1..geometry.len() {
        travelled += haversine_km(geometry[i - 1], geometry[i]);
        current.push(geometry[i]);

        if travelled >= MAX_SEGMENT_LENGTH_KM && parts.len() < MAX_CUTS {
            parts.push(current);
            current = vec![geometry[i]];
            travelled = 0.0;
        }
    }

    if current.len() > 1 {
        parts.push(current);
    }

    if parts.is_empty() {
        parts.push(geometry.to_vec());
    }

    parts
}

/// Assign ids and labels in order. A lone segment is labeled as covering
/// the whole road.
fn finalize(road: &Road, parts: Vec<Vec<Point>>) -> Vec<Segment> {
    let total = parts.len();

    parts
        .into_iter()
        .enumerate()
        .map(|(i, geometry)| Segment {
            id: format!("{}-{}", road.id, i + 1),
            road_id: road.id,
            description: if total == 1 {
                WHOLE_ROAD_LABEL.to_string()
            } else {
                format!("Segment {} of {}", i + 1, total)
            },
            geometry,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::polyline_length_km;

    // ~1 km of latitude in degrees
    const KM_LAT: f64 = 1.0 / 111.19;

    fn road(id: i64, geometry: Vec<Point>) -> Road {
        Road {
            id,
            name: format!("Road {id}"),
            geometry,
        }
    }

    /// Straight north-south polyline of `points` vertices spanning `total_km`.
    fn straight_road(id: i64, points: usize, total_km: f64) -> Road {
        let step = total_km / (points - 1) as f64 * KM_LAT;
        road(
            id,
            (0..points)
                .map(|i| Point(45.0 + i as f64 * step, -71.0))
                .collect(),
        )
    }

    /// L-shaped polyline: `leg` points north then `leg` points east, spaced
    /// `spacing_km` apart.
    fn l_shaped_road(id: i64, leg: usize, spacing_km: f64) -> Road {
        let step = spacing_km * KM_LAT;
        let mut points: Vec<Point> = (0..leg).map(|i| Point(45.0 + i as f64 * step, -71.0)).collect();
        let corner_lat = points[leg - 1].lat();
        // Longitude degrees are shorter at 45N; correct the spacing for it
        let lon_step = step / 45f64.to_radians().cos();
        points.extend((1..=leg).map(|i| Point(corner_lat, -71.0 + i as f64 * lon_step)));
        road(id, points)
    }

    /// Segments must tile the road exactly: each part starts on the point
    /// the previous one ended with, and dropping those shared boundary
    /// points reconstructs the input.
    fn assert_reconstructs(road: &Road, segments: &[Segment]) {
        let mut rebuilt: Vec<Point> = Vec::new();
        for (i, seg) in segments.iter().enumerate() {
            if i == 0 {
                rebuilt.extend_from_slice(&seg.geometry);
            } else {
                assert_eq!(
                    segments[i - 1].geometry.last(),
                    seg.geometry.first(),
                    "segment {} does not share its boundary",
                    seg.id
                );
                rebuilt.extend_from_slice(&seg.geometry[1..]);
            }
        }
        assert_eq!(rebuilt, road.geometry);
    }

    #[test]
    fn short_road_is_a_single_whole_road_segment() {
        let r = straight_road(10, 5, 1.0);
        let segments = segment_road(&r);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].id, "10-1");
        assert_eq!(segments[0].description, "All visible segments");
        assert_eq!(segments[0].geometry, r.geometry);
    }

    #[test]
    fn straight_long_road_splits_by_distance() {
        // 20 evenly spaced points over 6.4 km, no turns: exactly two parts
        // of roughly 3.2 km each.
        let r = straight_road(20, 20, 6.4);
        let segments = segment_road(&r);

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].id, "20-1");
        assert_eq!(segments[1].id, "20-2");
        assert_eq!(segments[0].description, "Segment 1 of 2");
        assert_eq!(segments[1].description, "Segment 2 of 2");

        for seg in &segments {
            let len = polyline_length_km(&seg.geometry);
            assert!((2.9..=3.5).contains(&len), "{}: {len} km", seg.id);
        }
        assert_reconstructs(&r, &segments);
    }

    #[test]
    fn right_angle_turn_is_detected_as_an_intersection() {
        let r = l_shaped_road(30, 10, 0.3);
        let segments = segment_road(&r);

        assert!(
            (2..=3).contains(&segments.len()),
            "expected 2-3 segments, got {}",
            segments.len()
        );
        for (i, seg) in segments.iter().enumerate() {
            assert_eq!(seg.id, format!("30-{}", i + 1));
        }
        assert_reconstructs(&r, &segments);
    }

    #[test]
    fn never_more_than_three_segments() {
        // Zig-zag with many qualifying turns still caps at 3 segments.
        let step = 0.3 * KM_LAT;
        let mut points = Vec::new();
        for i in 0..40 {
            let lat = 45.0 + i as f64 * step;
            let lon = if (i / 4) % 2 == 0 { -71.0 } else { -71.0 + step };
            points.push(Point(lat, lon));
        }
        let r = road(40, points);
        let segments = segment_road(&r);
        assert!(segments.len() <= 3, "got {} segments", segments.len());
        assert_reconstructs(&r, &segments);
    }

    #[test]
    fn segmentation_is_deterministic() {
        let r = l_shaped_road(50, 12, 0.4);
        assert_eq!(segment_road(&r), segment_road(&r));
    }

    #[test]
    fn nan_coordinates_yield_trivial_segment() {
        let mut geometry: Vec<Point> = (0..20).map(|i| Point(45.0 + i as f64 * 0.01, -71.0)).collect();
        geometry[7] = Point(f64::NAN, -71.0);
        let r = road(60, geometry);
        let segments = segment_road(&r);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].description, "All visible segments");
    }

    #[test]
    fn degenerate_geometry_does_not_panic() {
        let r = road(70, vec![Point(45.0, -71.0)]);
        let segments = segment_road(&r);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].id, "70-1");

        let empty = road(71, Vec::new());
        assert_eq!(segment_road(&empty).len(), 1);
    }

    #[test]
    fn duplicate_points_are_skipped_not_fatal() {
        let mut geometry: Vec<Point> = (0..20)
            .map(|i| Point(45.0 + i as f64 * 0.005, -71.0))
            .collect();
        geometry[9] = geometry[8];
        geometry[10] = geometry[8];
        let r = road(80, geometry);
        let segments = segment_road(&r);
        assert!(!segments.is_empty());
        assert_reconstructs(&r, &segments);
    }
}
