//! Feature modules implementing the bulkload API
//!
//! Each feature is a vertical slice with its own commands, queries, and
//! routes, following the CQRS pattern:
//!
//! - `commands/` - Write operations (create, cancel, resume)
//! - `queries/` - Read operations (get, list)
//! - `routes.rs` - HTTP route definitions
//!
//! Commands and queries implement the mediator pattern using the
//! `mediator` crate.

pub mod jobs;

use axum::Router;
use std::sync::Arc;

use bulkload_engine::engine::IngestionEngine;
use bulkload_engine::state::JobStateStore;
use bulkload_engine::store::RecordStore;

use crate::storage::UploadStore;

/// Shared state for all feature routes
///
/// Stores are trait objects so tests and local development can swap the
/// Postgres/Redis backends for in-memory ones.
#[derive(Clone)]
pub struct FeatureState {
    /// Job status documents and cancellation markers
    pub state_store: Arc<dyn JobStateStore>,
    /// Durable ingested records and the failure log
    pub record_store: Arc<dyn RecordStore>,
    /// Retained raw upload bytes, keyed by job id
    pub uploads: UploadStore,
    /// The ingestion engine driving background runs
    pub engine: Arc<IngestionEngine>,
}

/// Creates the API router with all feature routes mounted
pub fn router(state: FeatureState) -> Router<()> {
    Router::new().merge(jobs::jobs_routes().with_state(state))
}
