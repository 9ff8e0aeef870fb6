//! Streaming sync loop
//!
//! Connects to the server's `/events` stream and feeds events to the
//! reconciler strictly in arrival order. A failed or closed stream is
//! reconnected after a fixed backoff and re-enters at `init` (full resync;
//! no partial resume, trading bandwidth for the absence of resume-divergence
//! bugs). A one-shot poll fills the state if no `init` arrives shortly
//! after startup, so first paint is never blocked on the stream transport.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use stormpath_common::events::SyncEvent;
use stormpath_common::report::{Coverage, Report, ReportStatus};

use crate::error::Result;
use crate::reconciler::ViewerState;

/// Backoff before reconnecting a failed or closed stream
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// How long to wait for the stream's `init` before polling once
pub const INIT_FALLBACK_DELAY: Duration = Duration::from_secs(5);

/// A report submission as sent to the server
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub road_id: i64,
    #[serde(flatten)]
    pub coverage: Coverage,
    pub status: ReportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Submission result; `failed` of `total` runs may have lost a race even
/// when some reports were accepted.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    pub success: bool,
    #[serde(default)]
    pub reports: Vec<Report>,
    #[serde(default)]
    pub failed: usize,
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub error: Option<String>,
}

/// Sync client for one server
#[derive(Debug, Clone)]
pub struct SyncClient {
    base_url: String,
    http: reqwest::Client,
}

impl SyncClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        SyncClient {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    /// Run the sync loop. Never returns; drop the future to stop syncing
    /// (closing the connection is the only cancellation the server needs).
    pub async fn run(self, state: Arc<Mutex<ViewerState>>) {
        // First-paint fallback: one-shot poll if no init lands in time
        let fallback_client = self.clone();
        let fallback_state = Arc::clone(&state);
        tokio::spawn(async move {
            tokio::time::sleep(INIT_FALLBACK_DELAY).await;
            if fallback_state.lock().await.is_initialized() {
                return;
            }
            debug!("No init received; falling back to a one-shot report poll");
            if let Err(e) = fallback_client.poll_reports(&fallback_state).await {
                warn!("Fallback report poll failed: {e}");
            }
        });

        loop {
            match self.stream_once(&state).await {
                Ok(()) => debug!("Event stream closed; reconnecting"),
                Err(e) => warn!("Event stream error: {e}; reconnecting"),
            }
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }

    /// One stream connection lifecycle: connect, then apply events until
    /// the stream ends or errors.
    async fn stream_once(&self, state: &Arc<Mutex<ViewerState>>) -> Result<()> {
        let response = self
            .http
            .get(format!("{}/events", self.base_url))
            .send()
            .await?
            .error_for_status()?;
        debug!("Connected to event stream");

        let mut body = response.bytes_stream();
        let mut decoder = SseFrameDecoder::default();

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            for payload in decoder.push_chunk(&chunk) {
                match serde_json::from_str::<SyncEvent>(&payload) {
                    Ok(event) => {
                        state.lock().await.apply(event);
                    }
                    // One malformed event is logged and skipped, never
                    // fatal to the stream
                    Err(e) => warn!("Skipping malformed sync event: {e}"),
                }
            }
        }

        Ok(())
    }

    /// One-shot full poll of the report set; applied as a snapshot
    pub async fn poll_reports(&self, state: &Arc<Mutex<ViewerState>>) -> Result<()> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct ReportsSnapshot {
            reports: Vec<Report>,
            last_change_id: i64,
        }

        let snapshot: ReportsSnapshot = self
            .http
            .get(format!("{}/api/reports", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        state
            .lock()
            .await
            .apply_init(snapshot.reports, snapshot.last_change_id);
        Ok(())
    }

    /// Submit a report. Accepted rows are inserted speculatively so the
    /// submitter sees them immediately; the authoritative `report_added`
    /// deltas replace them by id. Rejections and partial failures come back
    /// in the outcome for the caller to surface.
    pub async fn submit(
        &self,
        state: &Arc<Mutex<ViewerState>>,
        submission: &Submission,
    ) -> Result<SubmitOutcome> {
        let response = self
            .http
            .post(format!("{}/api/reports", self.base_url))
            .json(submission)
            .send()
            .await?;
        let outcome: SubmitOutcome = response.json().await?;

        if !outcome.reports.is_empty() {
            let mut state = state.lock().await;
            for report in &outcome.reports {
                state.insert_speculative(report.clone());
            }
        }

        Ok(outcome)
    }
}

/// Incremental SSE framing decoder.
///
/// Accumulates bytes into lines and `data:` lines into event payloads,
/// dispatching a payload at each blank line. Comment lines (leading `:`,
/// the server's keep-alives) and unknown fields are ignored.
#[derive(Debug, Default)]
struct SseFrameDecoder {
    line_buf: Vec<u8>,
    data_lines: Vec<String>,
}

impl SseFrameDecoder {
    /// Feed a chunk; returns every event payload completed by it.
    fn push_chunk(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut payloads = Vec::new();
        for &byte in chunk {
            if byte == b'\n' {
                let raw = std::mem::take(&mut self.line_buf);
                let line = String::from_utf8_lossy(&raw);
                let line = line.strip_suffix('\r').unwrap_or(&line);
                if let Some(payload) = self.push_line(line) {
                    payloads.push(payload);
                }
            } else {
                self.line_buf.push(byte);
            }
        }
        payloads
    }

    fn push_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            if self.data_lines.is_empty() {
                return None;
            }
            return Some(std::mem::take(&mut self.data_lines).join("\n"));
        }
        if line.starts_with(':') {
            return None;
        }
        if let Some(value) = line.strip_prefix("data:") {
            let value = value.strip_prefix(' ').unwrap_or(value);
            self.data_lines.push(value.to_string());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoder_dispatches_on_blank_line() {
        let mut decoder = SseFrameDecoder::default();
        let payloads = decoder.push_chunk(b"data: {\"type\":\"init\"}\n\n");
        assert_eq!(payloads, vec!["{\"type\":\"init\"}".to_string()]);
    }

    #[test]
    fn decoder_handles_chunks_split_mid_line() {
        let mut decoder = SseFrameDecoder::default();
        assert!(decoder.push_chunk(b"data: {\"a\"").is_empty());
        assert!(decoder.push_chunk(b":1}\n").is_empty());
        let payloads = decoder.push_chunk(b"\n");
        assert_eq!(payloads, vec!["{\"a\":1}".to_string()]);
    }

    #[test]
    fn decoder_ignores_comments_and_crlf() {
        let mut decoder = SseFrameDecoder::default();
        let payloads = decoder.push_chunk(b": keep-alive\r\n\r\ndata: {}\r\n\r\n");
        assert_eq!(payloads, vec!["{}".to_string()]);
    }

    #[test]
    fn decoder_joins_multi_line_data() {
        let mut decoder = SseFrameDecoder::default();
        let payloads = decoder.push_chunk(b"data: line one\ndata: line two\n\n");
        assert_eq!(payloads, vec!["line one\nline two".to_string()]);
    }

    #[test]
    fn decoded_payload_parses_as_sync_event() {
        let mut decoder = SseFrameDecoder::default();
        let payloads =
            decoder.push_chunk(b"data: {\"type\":\"init\",\"reports\":[],\"lastChangeId\":4}\n\n");
        let event: SyncEvent = serde_json::from_str(&payloads[0]).unwrap();
        assert_eq!(event.change_id(), 4);
    }

    #[test]
    fn submission_serializes_with_flattened_coverage() {
        let submission = Submission {
            road_id: 42,
            coverage: Coverage::segment_set(["42-1"]),
            status: ReportStatus::Ice,
            notes: None,
        };
        let json = serde_json::to_value(&submission).unwrap();
        assert_eq!(json["roadId"], 42);
        assert_eq!(json["kind"], "segment-set");
        assert!(json.get("notes").is_none());
    }
}
