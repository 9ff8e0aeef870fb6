//! stormpath-client library - viewer-side sync
//!
//! Maintains a local replica of the server's report set from the SSE sync
//! stream, with a polling fallback for first paint and reconnect/backoff on
//! stream failure. Rendering layers consume the reconciler's per-road
//! coverage and the affected-road sets it returns.

pub mod error;
pub mod reconciler;
pub mod stream;

pub use error::{Error, Result};
pub use reconciler::{Applied, ViewerState};
pub use stream::SyncClient;
