//! stormpath-server library - report submission and viewer sync service
//!
//! Serves the community road-condition map: validates and persists hazard
//! reports against per-road segment coverage, and streams every mutation to
//! connected viewers over SSE.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{delete, get, post, put};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::roads::RoadCatalog;

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod resolver;
pub mod roads;

pub use error::{Error, Result};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (reports + change log)
    pub db: SqlitePool,
    /// Road catalog with derived segments, immutable for the process
    pub roads: Arc<RoadCatalog>,
    /// Change-log poll interval for viewer streams
    pub poll_interval: Duration,
}

impl AppState {
    pub fn new(db: SqlitePool, roads: Arc<RoadCatalog>, poll_interval: Duration) -> Self {
        Self {
            db,
            roads,
            poll_interval,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(api::health::health))
        // Report set + submission
        .route("/api/reports", get(api::reports::list_reports))
        .route("/api/reports", post(api::reports::submit_report))
        // Privileged mutation paths (authorization is upstream)
        .route("/api/reports/:id/status", put(api::reports::change_status))
        .route("/api/reports/:id", delete(api::reports::delete_report))
        // Segment addressing for selection UIs
        .route("/api/roads/:id/segments", get(api::reports::road_segments))
        // SSE viewer sync stream
        .route("/events", get(api::sse::event_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
