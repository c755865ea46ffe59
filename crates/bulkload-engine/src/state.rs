//! Job state store: status documents and the cancellation marker
//!
//! One mutable JSON document per job plus a separate presence-only
//! cancellation marker. Writes are last-writer-wins on the whole document;
//! there is no optimistic locking. The cancel operation flips the document
//! status eagerly, but the authoritative cancelled cursor is the engine's
//! own write once it observes the marker.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Job lifecycle state.
///
/// `Cancelled` is not terminal: a cancelled job can be resumed back to
/// `Processing`. There is no failed state; per-record failures are
/// counters, never a job-level outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Completed,
    Cancelled,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "cancelled" => Ok(JobStatus::Cancelled),
            _ => Err(anyhow::anyhow!("Invalid job status: {}", s)),
        }
    }
}

/// The persistent status document for one job.
///
/// Serialized with camelCase keys; this is both the stored shape and the
/// wire shape returned by the job API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDocument {
    pub status: JobStatus,
    /// Content fingerprint of the source file.
    pub file_hash: String,
    /// Display metadata only.
    pub file_name: String,
    /// Records in the source, computed once per processing attempt.
    pub total_records: u64,
    pub processed_records: u64,
    pub success_count: u64,
    pub fail_count: u64,
    /// Zero-based index of the last record considered; -1 before any
    /// record has been. Resume starts at `last_processed_index + 1`.
    pub last_processed_index: i64,
}

impl JobDocument {
    /// Fresh document for a newly created job.
    pub fn new(file_hash: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Processing,
            file_hash: file_hash.into(),
            file_name: file_name.into(),
            total_records: 0,
            processed_records: 0,
            success_count: 0,
            fail_count: 0,
            last_processed_index: -1,
        }
    }

    /// Counter consistency that must hold at every checkpoint.
    pub fn counters_consistent(&self) -> bool {
        self.processed_records == self.success_count + self.fail_count
    }
}

/// Errors from job state store operations.
#[derive(Debug, Error)]
pub enum StateStoreError {
    #[error("State store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt job document: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Key-value store for job documents and cancellation markers.
///
/// Two logical namespaces keyed by job id: the status document (read/
/// write, last-writer-wins) and the cancellation marker (set/check/clear,
/// presence-only).
#[async_trait]
pub trait JobStateStore: Send + Sync {
    async fn get_job(&self, job_id: &str) -> Result<Option<JobDocument>, StateStoreError>;

    async fn put_job(&self, job_id: &str, document: &JobDocument) -> Result<(), StateStoreError>;

    /// All known jobs, id -> document.
    async fn list_jobs(&self) -> Result<HashMap<String, JobDocument>, StateStoreError>;

    /// Request cancellation of a job. Presence of the marker is the signal.
    async fn set_cancel_marker(&self, job_id: &str) -> Result<(), StateStoreError>;

    /// Polled by the engine once per record.
    async fn cancel_requested(&self, job_id: &str) -> Result<bool, StateStoreError>;

    /// Cleared when a job is resumed.
    async fn clear_cancel_marker(&self, job_id: &str) -> Result<(), StateStoreError>;
}
