//! In-memory store backends
//!
//! Real implementations of [`RecordStore`] and [`JobStateStore`] over
//! mutexed maps. They back the test suite and local development runs that
//! have no Postgres or Redis available. The job state backend records
//! every document write so tests can assert invariants at each checkpoint,
//! not just at finalization.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::state::{JobDocument, JobStateStore, StateStoreError};
use crate::store::{FailedRecord, NewRecord, RecordStore, RecordStoreError, StoredRecord};

/// In-memory record store with a unique index on email.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<HashMap<String, StoredRecord>>,
    failures: Mutex<Vec<FailedRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the failure log, in append order.
    pub fn failures(&self) -> Vec<FailedRecord> {
        self.failures.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Seed a record directly, bypassing the engine.
    pub fn seed(&self, record: StoredRecord) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(record.email.clone(), record);
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<StoredRecord>, RecordStoreError> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        Ok(records.get(email).cloned())
    }

    async fn insert(&self, record: &NewRecord) -> Result<(), RecordStoreError> {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        if records.contains_key(&record.email) {
            return Err(RecordStoreError::Duplicate(record.email.clone()));
        }
        records.insert(
            record.email.clone(),
            StoredRecord {
                name: record.name.clone(),
                email: record.email.clone(),
                file_hash: record.file_hash.clone(),
                job_id: record.job_id.clone(),
            },
        );
        Ok(())
    }

    async fn append_failure(&self, failure: &FailedRecord) -> Result<(), RecordStoreError> {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(failure.clone());
        Ok(())
    }
}

/// In-memory job state store with a write log for checkpoint assertions.
#[derive(Default)]
pub struct MemoryJobStateStore {
    jobs: Mutex<HashMap<String, JobDocument>>,
    cancel_markers: Mutex<HashSet<String>>,
    writes: Mutex<Vec<JobDocument>>,
}

impl MemoryJobStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every document write in order, including interim checkpoints.
    pub fn document_writes(&self) -> Vec<JobDocument> {
        self.writes.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl JobStateStore for MemoryJobStateStore {
    async fn get_job(&self, job_id: &str) -> Result<Option<JobDocument>, StateStoreError> {
        let jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(jobs.get(job_id).cloned())
    }

    async fn put_job(&self, job_id: &str, document: &JobDocument) -> Result<(), StateStoreError> {
        self.jobs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(job_id.to_string(), document.clone());
        self.writes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(document.clone());
        Ok(())
    }

    async fn list_jobs(&self) -> Result<HashMap<String, JobDocument>, StateStoreError> {
        let jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(jobs.clone())
    }

    async fn set_cancel_marker(&self, job_id: &str) -> Result<(), StateStoreError> {
        self.cancel_markers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(job_id.to_string());
        Ok(())
    }

    async fn cancel_requested(&self, job_id: &str) -> Result<bool, StateStoreError> {
        let markers = self.cancel_markers.lock().unwrap_or_else(|e| e.into_inner());
        Ok(markers.contains(job_id))
    }

    async fn clear_cancel_marker(&self, job_id: &str) -> Result<(), StateStoreError> {
        self.cancel_markers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(job_id);
        Ok(())
    }
}
