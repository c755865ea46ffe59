//! Job routes
//!
//! Upload creates a job and returns immediately; the remaining routes
//! query and control the background run. Error bodies follow the
//! `{"error": message}` shape the dashboard polls against.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use super::commands::{
    cancel::handle as handle_cancel, create::handle as handle_create,
    resume::handle as handle_resume, CancelJobCommand, CancelJobError, CreateJobCommand,
    CreateJobError, ResumeJobCommand, ResumeJobError,
};
use super::queries::{
    get_job::handle as handle_get_job, list_jobs::handle as handle_list_jobs, GetJobError,
    GetJobQuery, ListJobsError, ListJobsQuery,
};
use crate::features::FeatureState;

/// Create job routes
pub fn jobs_routes() -> Router<FeatureState> {
    Router::new()
        .route("/upload", post(upload))
        .route("/jobs", get(list_jobs))
        .route("/jobs/:job_id", get(get_job))
        .route("/jobs/:job_id/cancel", post(cancel_job))
        .route("/jobs/:job_id/resume", post(resume_job))
}

/// Create a job from an uploaded file
///
/// POST /upload (multipart, field "file")
#[tracing::instrument(skip(state, multipart))]
async fn upload(
    State(state): State<FeatureState>,
    mut multipart: Multipart,
) -> Result<Response, JobApiError> {
    let mut file_name = String::new();
    let mut content: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| JobApiError::BadRequest(format!("Failed to read multipart field: {e}")))?
    {
        if field.name() == Some("file") {
            file_name = field.file_name().unwrap_or("upload.csv").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| JobApiError::BadRequest(format!("Failed to read file bytes: {e}")))?;
            content = Some(data.to_vec());
        }
    }

    let content = content.ok_or(JobApiError::Create(CreateJobError::EmptyUpload))?;

    let command = CreateJobCommand { file_name, content };
    let response = handle_create(state, command).await?;

    Ok((StatusCode::OK, Json(json!(response))).into_response())
}

/// List all jobs
///
/// GET /jobs
async fn list_jobs(State(state): State<FeatureState>) -> Result<Response, JobApiError> {
    let jobs = handle_list_jobs(state, ListJobsQuery::default()).await?;
    Ok((StatusCode::OK, Json(json!(jobs))).into_response())
}

/// Get a specific job by ID
///
/// GET /jobs/:job_id
async fn get_job(
    State(state): State<FeatureState>,
    Path(job_id): Path<String>,
) -> Result<Response, JobApiError> {
    let document = handle_get_job(state, GetJobQuery { job_id }).await?;
    Ok((StatusCode::OK, Json(json!(document))).into_response())
}

/// Request cancellation of a processing job
///
/// POST /jobs/:job_id/cancel
async fn cancel_job(
    State(state): State<FeatureState>,
    Path(job_id): Path<String>,
) -> Result<Response, JobApiError> {
    let ack = handle_cancel(state, CancelJobCommand { job_id }).await?;
    Ok((StatusCode::OK, Json(json!(ack))).into_response())
}

/// Resume a cancelled job from its checkpoint
///
/// POST /jobs/:job_id/resume
async fn resume_job(
    State(state): State<FeatureState>,
    Path(job_id): Path<String>,
) -> Result<Response, JobApiError> {
    let ack = handle_resume(state, ResumeJobCommand { job_id }).await?;
    Ok((StatusCode::OK, Json(json!(ack))).into_response())
}

#[derive(Debug)]
enum JobApiError {
    Create(CreateJobError),
    Cancel(CancelJobError),
    Resume(ResumeJobError),
    Get(GetJobError),
    List(ListJobsError),
    BadRequest(String),
}

impl From<CreateJobError> for JobApiError {
    fn from(err: CreateJobError) -> Self {
        Self::Create(err)
    }
}

impl From<CancelJobError> for JobApiError {
    fn from(err: CancelJobError) -> Self {
        Self::Cancel(err)
    }
}

impl From<ResumeJobError> for JobApiError {
    fn from(err: ResumeJobError) -> Self {
        Self::Resume(err)
    }
}

impl From<GetJobError> for JobApiError {
    fn from(err: GetJobError) -> Self {
        Self::Get(err)
    }
}

impl From<ListJobsError> for JobApiError {
    fn from(err: ListJobsError) -> Self {
        Self::List(err)
    }
}

impl IntoResponse for JobApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            JobApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),

            JobApiError::Create(CreateJobError::EmptyUpload)
            | JobApiError::Create(CreateJobError::FileNameLength) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            },
            JobApiError::Create(CreateJobError::Storage(_)) => {
                tracing::error!("Failed to retain upload: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "A storage error occurred".to_string())
            },

            JobApiError::Get(GetJobError::NotFound)
            | JobApiError::Cancel(CancelJobError::NotFound)
            | JobApiError::Resume(ResumeJobError::NotFound) => {
                (StatusCode::NOT_FOUND, "Job not found".to_string())
            },

            JobApiError::Cancel(CancelJobError::InvalidState(_))
            | JobApiError::Resume(ResumeJobError::InvalidState(_)) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            },

            JobApiError::Resume(ResumeJobError::FileUnavailable(_)) => {
                tracing::error!("Resume failed: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Source file unavailable".to_string())
            },

            JobApiError::Create(CreateJobError::StateStore(_))
            | JobApiError::Cancel(CancelJobError::StateStore(_))
            | JobApiError::Resume(ResumeJobError::StateStore(_))
            | JobApiError::Get(GetJobError::StateStore(_))
            | JobApiError::List(ListJobsError::StateStore(_)) => {
                tracing::error!("State store error: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "A state store error occurred".to_string())
            },
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl std::fmt::Display for JobApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create(e) => write!(f, "{}", e),
            Self::Cancel(e) => write!(f, "{}", e),
            Self::Resume(e) => write!(f, "{}", e),
            Self::Get(e) => write!(f, "{}", e),
            Self::List(e) => write!(f, "{}", e),
            Self::BadRequest(message) => write!(f, "{}", message),
        }
    }
}
