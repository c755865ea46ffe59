//! Resume job command
//!
//! Reloads the retained upload, clears the cancellation marker, and
//! re-invokes the engine from the checkpointed cursor. The cursor can be
//! up to one checkpoint interval stale; replayed records are re-validated
//! but never re-inserted, so the replay is harmless.

use mediator::Request;
use serde::{Deserialize, Serialize};

use bulkload_engine::state::{JobStatus, StateStoreError};

use crate::features::FeatureState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeJobCommand {
    pub job_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeJobResponse {
    pub status: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ResumeJobError {
    #[error("Job not found")]
    NotFound,
    #[error("Can only resume cancelled jobs")]
    InvalidState(JobStatus),
    #[error("Source file unavailable: {0}")]
    FileUnavailable(std::io::Error),
    #[error("State store error: {0}")]
    StateStore(#[from] StateStoreError),
}

impl Request<Result<ResumeJobResponse, ResumeJobError>> for ResumeJobCommand {}

#[tracing::instrument(skip(state), fields(job_id = %command.job_id))]
pub async fn handle(
    state: FeatureState,
    command: ResumeJobCommand,
) -> Result<ResumeJobResponse, ResumeJobError> {
    let document = state
        .state_store
        .get_job(&command.job_id)
        .await?
        .ok_or(ResumeJobError::NotFound)?;

    if document.status != JobStatus::Cancelled {
        return Err(ResumeJobError::InvalidState(document.status));
    }

    // Fail before touching any state: a missing file leaves the job in
    // its prior cancelled state.
    let buffer = state
        .uploads
        .load(&command.job_id)
        .await
        .map_err(ResumeJobError::FileUnavailable)?;

    state.state_store.clear_cancel_marker(&command.job_id).await?;

    let start_index = (document.last_processed_index + 1).max(0) as u64;
    state.engine.spawn(
        buffer,
        document.file_hash.clone(),
        command.job_id.clone(),
        start_index,
    );

    tracing::info!(job_id = %command.job_id, start_index, "Job resumed");

    Ok(ResumeJobResponse {
        status: "resumed".to_string(),
    })
}
