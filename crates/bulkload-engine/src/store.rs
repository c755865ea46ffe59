//! Record store gateway
//!
//! The durable store that holds ingested records and the append-only
//! failure log. The engine only ever needs three operations, so backends
//! (Postgres in the server, in-memory for tests and local development)
//! implement the [`RecordStore`] trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A record as it exists in the durable store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub name: String,
    pub email: String,
    /// Fingerprint of the upload this record was first ingested from.
    pub file_hash: String,
    pub job_id: String,
}

/// A record to be inserted, tagged with its source upload and job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub name: String,
    pub email: String,
    pub file_hash: String,
    pub job_id: String,
}

/// Append-only log entry for a rejected input row. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedRecord {
    pub name: String,
    pub email: String,
    pub error: String,
    pub job_id: String,
}

/// Errors from record store operations.
#[derive(Debug, Error)]
pub enum RecordStoreError {
    /// A record with this email already exists. This is a benign race
    /// (two invocations of the same job can both try the insert), not a
    /// fatal error.
    #[error("Record with email {0} already exists")]
    Duplicate(String),

    #[error("Record store unavailable: {0}")]
    Unavailable(String),
}

/// Gateway to the durable record store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Look up a record by its unique email key.
    async fn find_by_email(&self, email: &str) -> Result<Option<StoredRecord>, RecordStoreError>;

    /// Insert a new record. Fails with [`RecordStoreError::Duplicate`] if
    /// the email is already present.
    async fn insert(&self, record: &NewRecord) -> Result<(), RecordStoreError>;

    /// Append a failure log entry. Fire-and-forget from the engine's
    /// perspective; an error here is logged, never fatal.
    async fn append_failure(&self, failure: &FailedRecord) -> Result<(), RecordStoreError>;
}
