//! Create job command
//!
//! Accepts raw upload bytes, fingerprints them, retains the file for
//! later resumes, initializes the job document, and kicks off the engine
//! as a detached background task. The caller gets the job id back
//! immediately; progress is observed through the job queries.

use mediator::Request;
use serde::{Deserialize, Serialize};

use bulkload_common::checksum::fingerprint;
use bulkload_engine::state::{JobDocument, StateStoreError};

use crate::features::FeatureState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJobCommand {
    pub file_name: String,
    #[serde(skip)]
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobResponse {
    pub job_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CreateJobError {
    #[error("No file uploaded")]
    EmptyUpload,
    #[error("File name must not exceed 255 characters")]
    FileNameLength,
    #[error("Failed to retain upload: {0}")]
    Storage(#[from] std::io::Error),
    #[error("State store error: {0}")]
    StateStore(#[from] StateStoreError),
}

impl Request<Result<CreateJobResponse, CreateJobError>> for CreateJobCommand {}

impl CreateJobCommand {
    pub fn validate(&self) -> Result<(), CreateJobError> {
        if self.content.is_empty() {
            return Err(CreateJobError::EmptyUpload);
        }
        if self.file_name.len() > 255 {
            return Err(CreateJobError::FileNameLength);
        }
        Ok(())
    }
}

#[tracing::instrument(skip(state, command), fields(file_name = %command.file_name))]
pub async fn handle(
    state: FeatureState,
    command: CreateJobCommand,
) -> Result<CreateJobResponse, CreateJobError> {
    command.validate()?;

    let file_hash = fingerprint(&command.content);
    let job_id = uuid::Uuid::new_v4().to_string();

    // Retain the original bytes first: a job without its file cannot be
    // resumed.
    state.uploads.save(&job_id, &command.content).await?;

    let document = JobDocument::new(&file_hash, &command.file_name);
    state.state_store.put_job(&job_id, &document).await?;

    state
        .engine
        .spawn(command.content, file_hash.clone(), job_id.clone(), 0);

    tracing::info!(job_id = %job_id, file_hash = %file_hash, "Ingestion job created");

    Ok(CreateJobResponse { job_id })
}
