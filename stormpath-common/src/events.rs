//! Sync wire events
//!
//! JSON payloads carried over the viewer event stream. Every event is a
//! single object with a `type` discriminator; deltas carry the change-log
//! position they correspond to so viewers can track their watermark.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::report::Report;

/// One event on a viewer's sync stream.
///
/// `Init` is always the first event of a connection and carries the full
/// report set plus the change-log position that snapshot reflects. Deltas
/// follow in non-decreasing `change_id` order. Added/updated deltas carry
/// the full current row; deleted deltas carry only the id, since the row is
/// already gone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    #[serde(rename_all = "camelCase")]
    Init {
        reports: Vec<Report>,
        last_change_id: i64,
    },
    #[serde(rename_all = "camelCase")]
    ReportAdded { report: Report, change_id: i64 },
    #[serde(rename_all = "camelCase")]
    ReportUpdated { report: Report, change_id: i64 },
    #[serde(rename_all = "camelCase")]
    ReportDeleted { report_id: Uuid, change_id: i64 },
}

impl SyncEvent {
    /// The change-log position carried by a delta; `Init` reports its
    /// snapshot position.
    pub fn change_id(&self) -> i64 {
        match self {
            SyncEvent::Init { last_change_id, .. } => *last_change_id,
            SyncEvent::ReportAdded { change_id, .. }
            | SyncEvent::ReportUpdated { change_id, .. }
            | SyncEvent::ReportDeleted { change_id, .. } => *change_id,
        }
    }
}
