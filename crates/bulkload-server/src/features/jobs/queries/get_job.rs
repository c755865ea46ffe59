//! Get job query
//!
//! Pure read of a single job's status document.

use mediator::Request;
use serde::{Deserialize, Serialize};

use bulkload_engine::state::{JobDocument, StateStoreError};

use crate::features::FeatureState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetJobQuery {
    pub job_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GetJobError {
    #[error("Job not found")]
    NotFound,
    #[error("State store error: {0}")]
    StateStore(#[from] StateStoreError),
}

impl Request<Result<JobDocument, GetJobError>> for GetJobQuery {}

pub async fn handle(state: FeatureState, query: GetJobQuery) -> Result<JobDocument, GetJobError> {
    state
        .state_store
        .get_job(&query.job_id)
        .await?
        .ok_or(GetJobError::NotFound)
}
