//! HTTP API
//!
//! REST endpoints for report submission and administration, plus the SSE
//! viewer sync stream.

pub mod health;
pub mod reports;
pub mod sse;
