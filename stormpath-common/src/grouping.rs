//! Contiguity grouping for multi-segment selections
//!
//! A selection of segment ids on one road becomes one report per maximal run
//! of consecutive indices. A run's combined geometry drops the duplicated
//! boundary points, and its label is synthesized from the first and last
//! segment labels.

use crate::geo::Point;
use crate::road::{segment_index, Segment};

/// A contiguous run of segments combined into one reportable span
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedSpan {
    pub segment_ids: Vec<String>,
    pub description: String,
    pub geometry: Vec<Point>,
}

/// Sort segment ids by their numeric suffix. Ids without a parsable suffix
/// sort last, in their incoming order.
pub fn sort_segment_ids(ids: &[String]) -> Vec<String> {
    let mut sorted = ids.to_vec();
    sorted.sort_by_key(|id| segment_index(id).unwrap_or(u32::MAX));
    sorted
}

/// Group sorted segment ids into maximal runs of consecutive indices.
pub fn group_contiguous(sorted_ids: &[String]) -> Vec<Vec<String>> {
    let mut groups: Vec<Vec<String>> = Vec::new();

    for id in sorted_ids {
        let index = segment_index(id);
        let extends_current = match (groups.last(), index) {
            (Some(group), Some(index)) => group
                .last()
                .and_then(|prev| segment_index(prev))
                .is_some_and(|prev| index == prev + 1),
            _ => false,
        };

        match groups.last_mut() {
            Some(group) if extends_current => group.push(id.clone()),
            _ => groups.push(vec![id.clone()]),
        }
    }

    groups
}

/// Combine one run into a single span.
///
/// Ids not present in `segments` contribute nothing; the caller is expected
/// to have validated membership already.
pub fn combine_run(run: &[String], segments: &[Segment]) -> CombinedSpan {
    let members: Vec<&Segment> = run
        .iter()
        .filter_map(|id| segments.iter().find(|s| &s.id == id))
        .collect();

    let mut geometry: Vec<Point> = Vec::new();
    for segment in &members {
        for point in &segment.geometry {
            if geometry.last() != Some(point) {
                geometry.push(*point);
            }
        }
    }

    CombinedSpan {
        segment_ids: run.to_vec(),
        description: describe_run(&members),
        geometry,
    }
}

/// "Segment 2 of 5" + "Segment 4 of 5" -> "Segments 2-4 of 5"; a lone
/// segment keeps its own label; anything unparsable falls back to a count.
fn describe_run(members: &[&Segment]) -> String {
    match members {
        [] => "0 segments".to_string(),
        [only] => only.description.clone(),
        [first, .., last] => {
            match (
                parse_segment_label(&first.description),
                parse_segment_label(&last.description),
            ) {
                (Some((a, total_a)), Some((b, total_b))) if total_a == total_b => {
                    format!("Segments {a}-{b} of {total_a}")
                }
                _ => format!("{} segments", members.len()),
            }
        }
    }
}

/// Parse "Segment {i} of {n}" into (i, n)
fn parse_segment_label(label: &str) -> Option<(u32, u32)> {
    let mut words = label.split_whitespace();
    if words.next() != Some("Segment") {
        return None;
    }
    let index = words.next()?.parse().ok()?;
    if words.next() != Some("of") {
        return None;
    }
    let total = words.next()?.parse().ok()?;
    Some((index, total))
}
