//! Cancel job command
//!
//! Sets the cancellation marker and eagerly flips the document status.
//! The engine keeps running until its next per-record poll observes the
//! marker, then writes the authoritative cancelled document with the
//! precise resume cursor.

use mediator::Request;
use serde::{Deserialize, Serialize};

use bulkload_engine::state::{JobStatus, StateStoreError};

use crate::features::FeatureState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelJobCommand {
    pub job_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelJobResponse {
    pub status: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CancelJobError {
    #[error("Job not found")]
    NotFound,
    #[error("Can only cancel processing jobs")]
    InvalidState(JobStatus),
    #[error("State store error: {0}")]
    StateStore(#[from] StateStoreError),
}

impl Request<Result<CancelJobResponse, CancelJobError>> for CancelJobCommand {}

#[tracing::instrument(skip(state), fields(job_id = %command.job_id))]
pub async fn handle(
    state: FeatureState,
    command: CancelJobCommand,
) -> Result<CancelJobResponse, CancelJobError> {
    let mut document = state
        .state_store
        .get_job(&command.job_id)
        .await?
        .ok_or(CancelJobError::NotFound)?;

    if document.status != JobStatus::Processing {
        return Err(CancelJobError::InvalidState(document.status));
    }

    state.state_store.set_cancel_marker(&command.job_id).await?;

    document.status = JobStatus::Cancelled;
    state.state_store.put_job(&command.job_id, &document).await?;

    tracing::info!(job_id = %command.job_id, "Cancellation requested");

    Ok(CancelJobResponse {
        status: "cancelled".to_string(),
    })
}
