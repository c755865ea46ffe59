//! List jobs query
//!
//! Enumerates every job document as a job id -> document mapping. No
//! pagination; the job list is expected to stay small.

use mediator::Request;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use bulkload_engine::state::{JobDocument, StateStoreError};

use crate::features::FeatureState;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListJobsQuery {}

#[derive(Debug, thiserror::Error)]
pub enum ListJobsError {
    #[error("State store error: {0}")]
    StateStore(#[from] StateStoreError),
}

impl Request<Result<HashMap<String, JobDocument>, ListJobsError>> for ListJobsQuery {}

pub async fn handle(
    state: FeatureState,
    _query: ListJobsQuery,
) -> Result<HashMap<String, JobDocument>, ListJobsError> {
    Ok(state.state_store.list_jobs().await?)
}
