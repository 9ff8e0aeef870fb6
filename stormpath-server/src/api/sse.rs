//! Server-Sent Events sync broadcaster
//!
//! One long-lived stream per viewer. Each connection first receives an
//! `init` event (full report set plus the change-log position the snapshot
//! reflects), then the loop polls the change log on a fixed interval and
//! emits one typed delta per new entry, advancing this viewer's watermark
//! after each emission. Closing the connection is the only cancellation
//! needed; the stream is dropped with it.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use sqlx::SqlitePool;
use tracing::{debug, error, warn};

use stormpath_common::events::SyncEvent;

use crate::db::changes::{ChangeLogEntry, ChangeType};
use crate::db::{changes, reports};
use crate::error::Result;
use crate::AppState;

/// GET /events - SSE viewer sync stream
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    debug!("New SSE viewer connected");
    let poll_interval = state.poll_interval;

    let stream = async_stream::stream! {
        match reports::snapshot(&state.db).await {
            // Ending the stream makes the viewer reconnect after backoff
            Err(e) => error!("Failed to build init snapshot: {e}"),
            Ok((snapshot, last_change_id)) => {
                let mut watermark = last_change_id;
                let init = SyncEvent::Init {
                    reports: snapshot,
                    last_change_id,
                };
                if let Some(event) = encode(&init) {
                    yield Ok(event);
                }

                loop {
                    tokio::time::sleep(poll_interval).await;

                    let entries = match changes::read_changes_since(&state.db, watermark).await {
                        Ok(entries) => entries,
                        Err(e) => {
                            // Transient read failure: retry next tick without
                            // advancing the watermark
                            warn!("Change log read failed: {e}");
                            continue;
                        }
                    };

                    for entry in entries {
                        match delta_for(&state.db, &entry).await {
                            Ok(delta) => {
                                if let Some(event) = encode(&delta) {
                                    yield Ok(event);
                                }
                                watermark = entry.change_id;
                            }
                            Err(e) => {
                                warn!("Failed to build delta for change {}: {e}", entry.change_id);
                                break;
                            }
                        }
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Turn a change-log entry into the delta a viewer should see.
///
/// An added/updated entry whose report row has since been deleted degrades
/// to a `report_deleted` delta; viewers must be told to drop the row, and
/// the later `deleted` entry is then a harmless duplicate.
pub(crate) async fn delta_for(db: &SqlitePool, entry: &ChangeLogEntry) -> Result<SyncEvent> {
    match entry.change_type {
        ChangeType::Deleted => Ok(SyncEvent::ReportDeleted {
            report_id: entry.report_id,
            change_id: entry.change_id,
        }),
        ChangeType::Added | ChangeType::Updated => {
            match reports::get_report(db, entry.report_id).await? {
                Some(report) => Ok(match entry.change_type {
                    ChangeType::Added => SyncEvent::ReportAdded {
                        report,
                        change_id: entry.change_id,
                    },
                    _ => SyncEvent::ReportUpdated {
                        report,
                        change_id: entry.change_id,
                    },
                }),
                None => {
                    debug!(
                        "Change {} references a missing report; degrading to delete",
                        entry.change_id
                    );
                    Ok(SyncEvent::ReportDeleted {
                        report_id: entry.report_id,
                        change_id: entry.change_id,
                    })
                }
            }
        }
    }
}

/// Serialize an event for the wire. Events are unnamed `data:` payloads;
/// the JSON itself carries the `type` discriminator.
fn encode(event: &SyncEvent) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Event::default().data(json)),
        Err(e) => {
            warn!("Failed to serialize sync event: {e}");
            None
        }
    }
}
