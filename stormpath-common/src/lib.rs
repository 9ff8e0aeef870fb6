//! Shared types and algorithms for StormPath modules.
//!
//! Holds everything both the server and viewer sides need to agree on:
//! the road/segment/report data model, the segmentation algorithm, coverage
//! derivation, contiguity grouping, notes validation, and the sync wire
//! events.

pub mod config;
pub mod coverage;
pub mod error;
pub mod events;
pub mod geo;
pub mod grouping;
pub mod report;
pub mod road;
pub mod segmenter;
pub mod validate;

pub use error::{Error, Result};
