//! Ingestion engine
//!
//! Drives the record source over an uploaded buffer, applies the
//! validate/dedup/insert policy per record, keeps running counters,
//! checkpoints progress periodically, and cooperatively honors the
//! cancellation marker. Per-record failures are counted and logged, never
//! fatal; the job itself only ever completes or gets cancelled.

use std::sync::Arc;
use thiserror::Error;

use crate::fault::FaultInjector;
use crate::source::{RawRecord, RecordSource};
use crate::state::{JobDocument, JobStateStore, JobStatus, StateStoreError};
use crate::store::{FailedRecord, NewRecord, RecordStore, RecordStoreError};

/// Persist an interim checkpoint every this many processed records.
///
/// Bounds checkpoint-write volume while bounding resume replay to at most
/// one interval's worth of re-validation (replayed records are
/// re-validated, not re-inserted, so the replay is idempotent).
pub const DEFAULT_CHECKPOINT_INTERVAL: u64 = 100;

const ERR_MISSING_FIELDS: &str = "Missing required fields";
const ERR_RANDOM_FAILURE: &str = "Random failure for testing";
const ERR_EMAIL_EXISTS: &str = "Email already exists";

/// Errors that abort an engine invocation.
///
/// Only decode-setup and state-store failures abort a run; everything at
/// the record level is absorbed into the fail counter.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to decode source: {0}")]
    Decode(#[from] csv::Error),

    #[error(transparent)]
    StateStore(#[from] StateStoreError),
}

/// How an engine invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Stream exhausted; job is terminal.
    Completed,
    /// Cancellation marker observed; job can be resumed.
    Cancelled,
}

enum RecordOutcome {
    Success,
    Failure,
}

/// The resumable ingestion job engine.
///
/// One invocation per job at a time is expected; the engine itself does
/// not enforce mutual exclusion across concurrent invocations (the insert
/// path tolerates the resulting duplicate-key races).
pub struct IngestionEngine {
    records: Arc<dyn RecordStore>,
    state: Arc<dyn JobStateStore>,
    faults: Arc<dyn FaultInjector>,
    checkpoint_interval: u64,
}

impl IngestionEngine {
    pub fn new(
        records: Arc<dyn RecordStore>,
        state: Arc<dyn JobStateStore>,
        faults: Arc<dyn FaultInjector>,
    ) -> Self {
        Self {
            records,
            state,
            faults,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
        }
    }

    /// Override the checkpoint cadence (minimum 1).
    pub fn with_checkpoint_interval(mut self, interval: u64) -> Self {
        self.checkpoint_interval = interval.max(1);
        self
    }

    /// Run one processing attempt over `buffer`, skipping records with
    /// index below `start_index`. `start_index = 0` is a fresh run;
    /// resume passes `last_processed_index + 1`.
    #[tracing::instrument(skip(self, buffer, file_hash), fields(job_id = %job_id, start_index))]
    pub async fn run(
        &self,
        buffer: &[u8],
        file_hash: &str,
        job_id: &str,
        start_index: u64,
    ) -> Result<RunOutcome, EngineError> {
        let source = RecordSource::new(buffer);

        // Full pre-pass; totalRecords is computed once per attempt.
        let total_records = source.count()?;

        let mut document = self
            .state
            .get_job(job_id)
            .await?
            .unwrap_or_else(|| JobDocument::new(file_hash, ""));
        document.status = JobStatus::Processing;
        document.total_records = total_records;
        self.state.put_job(job_id, &document).await?;

        tracing::info!(total_records, "Ingestion run started");

        // Counters are loop-local; resumed runs continue from the
        // checkpointed values.
        let mut processed = document.processed_records;
        let mut success = document.success_count;
        let mut fail = document.fail_count;

        let mut next_index: u64 = 0;
        for decoded in source.records()? {
            let index = next_index;
            next_index += 1;

            // Resume-by-reskip: the decode is always full, but skipped
            // records get no validation and no side effects.
            if index < start_index {
                continue;
            }

            // Cooperative cancellation, polled once per record. An
            // in-flight record always finishes before this takes effect.
            if self.state.cancel_requested(job_id).await? {
                document.status = JobStatus::Cancelled;
                document.processed_records = processed;
                document.success_count = success;
                document.fail_count = fail;
                document.last_processed_index = index as i64 - 1;
                self.state.put_job(job_id, &document).await?;

                tracing::info!(
                    processed,
                    last_processed_index = document.last_processed_index,
                    "Cancellation marker observed, run stopped"
                );
                return Ok(RunOutcome::Cancelled);
            }

            match self.process_record(decoded, file_hash, job_id).await {
                RecordOutcome::Success => success += 1,
                RecordOutcome::Failure => fail += 1,
            }
            processed += 1;

            if processed % self.checkpoint_interval == 0 {
                document.status = JobStatus::Processing;
                document.processed_records = processed;
                document.success_count = success;
                document.fail_count = fail;
                document.last_processed_index = index as i64;
                self.state.put_job(job_id, &document).await?;

                tracing::debug!(processed, success, fail, "Checkpoint persisted");
            }
        }

        document.status = JobStatus::Completed;
        document.processed_records = processed;
        document.success_count = success;
        document.fail_count = fail;
        document.last_processed_index = next_index as i64 - 1;
        self.state.put_job(job_id, &document).await?;

        tracing::info!(processed, success, fail, "Ingestion run completed");
        Ok(RunOutcome::Completed)
    }

    /// Spawn a detached run; the caller gets its acknowledgement before
    /// processing finishes.
    pub fn spawn(
        self: &Arc<Self>,
        buffer: Vec<u8>,
        file_hash: String,
        job_id: String,
        start_index: u64,
    ) -> tokio::task::JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            match engine.run(&buffer, &file_hash, &job_id, start_index).await {
                Ok(outcome) => {
                    tracing::info!(job_id = %job_id, outcome = ?outcome, "Background run finished");
                },
                Err(err) => {
                    tracing::error!(job_id = %job_id, error = %err, "Background run aborted");
                },
            }
        })
    }

    /// Per-record decision policy. Never returns an error: everything
    /// unexpected is absorbed as a counted failure.
    async fn process_record(
        &self,
        decoded: Result<RawRecord, csv::Error>,
        file_hash: &str,
        job_id: &str,
    ) -> RecordOutcome {
        let record = match decoded {
            Ok(record) => record,
            Err(err) => {
                self.log_failure("", "", &err.to_string(), job_id).await;
                return RecordOutcome::Failure;
            },
        };

        if !record.has_required_fields() {
            self.log_failure(&record.name, &record.email, ERR_MISSING_FIELDS, job_id)
                .await;
            return RecordOutcome::Failure;
        }

        if self.faults.should_fail() {
            self.log_failure(&record.name, &record.email, ERR_RANDOM_FAILURE, job_id)
                .await;
            return RecordOutcome::Failure;
        }

        match self.records.find_by_email(&record.email).await {
            Ok(Some(existing)) => {
                if existing.file_hash == file_hash {
                    // Same file re-ingested; already correctly stored.
                    RecordOutcome::Success
                } else {
                    self.log_failure(&record.name, &record.email, ERR_EMAIL_EXISTS, job_id)
                        .await;
                    RecordOutcome::Failure
                }
            },
            Ok(None) => {
                let new_record = NewRecord {
                    name: record.name.clone(),
                    email: record.email.clone(),
                    file_hash: file_hash.to_string(),
                    job_id: job_id.to_string(),
                };
                match self.records.insert(&new_record).await {
                    Ok(()) => RecordOutcome::Success,
                    Err(RecordStoreError::Duplicate(email)) => {
                        // Benign race with a concurrent invocation of the
                        // same job; the record exists.
                        tracing::debug!(email = %email, "Insert lost a duplicate race");
                        RecordOutcome::Success
                    },
                    Err(err) => {
                        self.log_failure(&record.name, &record.email, &err.to_string(), job_id)
                            .await;
                        RecordOutcome::Failure
                    },
                }
            },
            Err(err) => {
                self.log_failure(&record.name, &record.email, &err.to_string(), job_id)
                    .await;
                RecordOutcome::Failure
            },
        }
    }

    async fn log_failure(&self, name: &str, email: &str, error: &str, job_id: &str) {
        let failure = FailedRecord {
            name: name.to_string(),
            email: email.to_string(),
            error: error.to_string(),
            job_id: job_id.to_string(),
        };
        // Fire-and-forget: a broken failure log must not abort the job.
        if let Err(err) = self.records.append_failure(&failure).await {
            tracing::warn!(job_id = %job_id, error = %err, "Failed to append failure record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::NoFaults;
    use crate::memory::{MemoryJobStateStore, MemoryRecordStore};
    use crate::state::JobStateStore;
    use crate::store::StoredRecord;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};

    const THREE_VALID: &[u8] =
        b"name,email\nAda,ada@example.com\nCharles,charles@example.com\nGrace,grace@example.com\n";

    fn engine_with(
        records: Arc<MemoryRecordStore>,
        state: Arc<MemoryJobStateStore>,
    ) -> IngestionEngine {
        IngestionEngine::new(records, state, Arc::new(NoFaults))
    }

    /// State store wrapper that sets the cancellation marker after a fixed
    /// number of cancellation polls, simulating a cancel request landing
    /// mid-stream.
    struct CancelAfter {
        inner: Arc<MemoryJobStateStore>,
        polls_before_cancel: u64,
        polls: AtomicU64,
    }

    #[async_trait]
    impl JobStateStore for CancelAfter {
        async fn get_job(&self, job_id: &str) -> Result<Option<JobDocument>, StateStoreError> {
            self.inner.get_job(job_id).await
        }

        async fn put_job(
            &self,
            job_id: &str,
            document: &JobDocument,
        ) -> Result<(), StateStoreError> {
            self.inner.put_job(job_id, document).await
        }

        async fn list_jobs(&self) -> Result<HashMap<String, JobDocument>, StateStoreError> {
            self.inner.list_jobs().await
        }

        async fn set_cancel_marker(&self, job_id: &str) -> Result<(), StateStoreError> {
            self.inner.set_cancel_marker(job_id).await
        }

        async fn cancel_requested(&self, job_id: &str) -> Result<bool, StateStoreError> {
            if self.polls.fetch_add(1, Ordering::SeqCst) >= self.polls_before_cancel {
                self.inner.set_cancel_marker(job_id).await?;
            }
            self.inner.cancel_requested(job_id).await
        }

        async fn clear_cancel_marker(&self, job_id: &str) -> Result<(), StateStoreError> {
            self.inner.clear_cancel_marker(job_id).await
        }
    }

    #[tokio::test]
    async fn test_three_valid_records_complete() {
        let records = Arc::new(MemoryRecordStore::new());
        let state = Arc::new(MemoryJobStateStore::new());
        let engine = engine_with(records.clone(), state.clone());

        let outcome = engine.run(THREE_VALID, "hash1", "job1", 0).await.unwrap();
        assert_eq!(outcome, RunOutcome::Completed);

        let doc = state.get_job("job1").await.unwrap().unwrap();
        assert_eq!(doc.status, JobStatus::Completed);
        assert_eq!(doc.total_records, 3);
        assert_eq!(doc.processed_records, 3);
        assert_eq!(doc.success_count, 3);
        assert_eq!(doc.fail_count, 0);
        assert_eq!(doc.last_processed_index, 2);
        assert_eq!(records.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_email_counted_as_failure() {
        let records = Arc::new(MemoryRecordStore::new());
        let state = Arc::new(MemoryJobStateStore::new());
        let engine = engine_with(records.clone(), state.clone());

        let buffer = b"name,email\nAda,ada@example.com\nNoEmail,\n";
        engine.run(buffer, "hash1", "job1", 0).await.unwrap();

        let doc = state.get_job("job1").await.unwrap().unwrap();
        assert_eq!(doc.success_count, 1);
        assert_eq!(doc.fail_count, 1);

        let failures = records.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].name, "NoEmail");
        assert_eq!(failures[0].error, "Missing required fields");
        assert_eq!(failures[0].job_id, "job1");
    }

    #[tokio::test]
    async fn test_duplicate_from_other_file_is_failure() {
        let records = Arc::new(MemoryRecordStore::new());
        let state = Arc::new(MemoryJobStateStore::new());
        records.seed(StoredRecord {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            file_hash: "other-file".into(),
            job_id: "job0".into(),
        });

        let engine = engine_with(records.clone(), state.clone());
        engine
            .run(b"name,email\nAda,ada@example.com\n", "hash1", "job1", 0)
            .await
            .unwrap();

        let doc = state.get_job("job1").await.unwrap().unwrap();
        assert_eq!(doc.success_count, 0);
        assert_eq!(doc.fail_count, 1);
        assert_eq!(records.failures()[0].error, "Email already exists");
        // The conflicting record is untouched.
        let stored = records.find_by_email("ada@example.com").await.unwrap().unwrap();
        assert_eq!(stored.file_hash, "other-file");
    }

    #[tokio::test]
    async fn test_same_file_rerun_is_idempotent() {
        let records = Arc::new(MemoryRecordStore::new());
        let state = Arc::new(MemoryJobStateStore::new());
        let engine = engine_with(records.clone(), state.clone());

        engine.run(THREE_VALID, "hash1", "job1", 0).await.unwrap();
        assert_eq!(records.len(), 3);

        // Replaying the whole file with the same fingerprint re-validates
        // but never re-inserts.
        let state2 = Arc::new(MemoryJobStateStore::new());
        let engine2 = engine_with(records.clone(), state2.clone());
        engine2.run(THREE_VALID, "hash1", "job2", 0).await.unwrap();

        let doc = state2.get_job("job2").await.unwrap().unwrap();
        assert_eq!(doc.success_count, 3);
        assert_eq!(doc.fail_count, 0);
        assert_eq!(records.len(), 3);
    }

    #[tokio::test]
    async fn test_counters_consistent_at_every_checkpoint() {
        let records = Arc::new(MemoryRecordStore::new());
        let state = Arc::new(MemoryJobStateStore::new());
        let engine =
            engine_with(records.clone(), state.clone()).with_checkpoint_interval(2);

        let mut buffer = Vec::from(&b"name,email\n"[..]);
        for i in 0..7 {
            buffer.extend_from_slice(format!("User{i},user{i}@example.com\n").as_bytes());
        }
        engine.run(&buffer, "hash1", "job1", 0).await.unwrap();

        let writes = state.document_writes();
        // Initial write + 3 interim checkpoints + final.
        assert_eq!(writes.len(), 5);
        for doc in &writes {
            assert!(doc.counters_consistent(), "checkpoint violates invariant: {doc:?}");
        }

        let final_doc = writes.last().unwrap();
        assert_eq!(final_doc.status, JobStatus::Completed);
        assert_eq!(final_doc.processed_records, 7);
        assert_eq!(final_doc.last_processed_index, 6);
    }

    #[tokio::test]
    async fn test_pre_set_marker_stops_before_first_record() {
        let records = Arc::new(MemoryRecordStore::new());
        let state = Arc::new(MemoryJobStateStore::new());
        state.set_cancel_marker("job1").await.unwrap();

        let engine = engine_with(records.clone(), state.clone());
        let outcome = engine.run(THREE_VALID, "hash1", "job1", 0).await.unwrap();

        assert_eq!(outcome, RunOutcome::Cancelled);
        let doc = state.get_job("job1").await.unwrap().unwrap();
        assert_eq!(doc.status, JobStatus::Cancelled);
        assert_eq!(doc.processed_records, 0);
        assert_eq!(doc.last_processed_index, -1);
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_latency_at_most_one_record() {
        let records = Arc::new(MemoryRecordStore::new());
        let inner = Arc::new(MemoryJobStateStore::new());
        // Marker lands during the second poll: record 0 processes, record 1
        // must not.
        let state = Arc::new(CancelAfter {
            inner: inner.clone(),
            polls_before_cancel: 1,
            polls: AtomicU64::new(0),
        });

        let engine = IngestionEngine::new(records.clone(), state, Arc::new(NoFaults));
        let outcome = engine.run(THREE_VALID, "hash1", "job1", 0).await.unwrap();

        assert_eq!(outcome, RunOutcome::Cancelled);
        let doc = inner.get_job("job1").await.unwrap().unwrap();
        assert_eq!(doc.processed_records, 1);
        assert_eq!(doc.last_processed_index, 0);
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_then_resume_processes_everything_once() {
        let records = Arc::new(MemoryRecordStore::new());
        let inner = Arc::new(MemoryJobStateStore::new());
        let state = Arc::new(CancelAfter {
            inner: inner.clone(),
            polls_before_cancel: 2,
            polls: AtomicU64::new(0),
        });

        let engine = IngestionEngine::new(records.clone(), state, Arc::new(NoFaults));
        let outcome = engine.run(THREE_VALID, "hash1", "job1", 0).await.unwrap();
        assert_eq!(outcome, RunOutcome::Cancelled);

        let cancelled = inner.get_job("job1").await.unwrap().unwrap();
        assert_eq!(cancelled.processed_records, 2);
        assert_eq!(cancelled.last_processed_index, 1);

        // Resume from the cursor with a plain store (marker cleared).
        inner.clear_cancel_marker("job1").await.unwrap();
        let engine = engine_with(records.clone(), inner.clone());
        let start = (cancelled.last_processed_index + 1) as u64;
        let outcome = engine.run(THREE_VALID, "hash1", "job1", start).await.unwrap();
        assert_eq!(outcome, RunOutcome::Completed);

        let doc = inner.get_job("job1").await.unwrap().unwrap();
        assert_eq!(doc.success_count + doc.fail_count, doc.total_records);
        assert_eq!(doc.success_count, 3);
        assert_eq!(doc.last_processed_index, 2);
        // No record double-inserted.
        assert_eq!(records.len(), 3);
    }

    #[tokio::test]
    async fn test_resume_replay_does_not_reinsert() {
        let records = Arc::new(MemoryRecordStore::new());
        let state = Arc::new(MemoryJobStateStore::new());
        let engine = engine_with(records.clone(), state.clone());

        // First run stored everything.
        engine.run(THREE_VALID, "hash1", "job1", 0).await.unwrap();

        // A stale cursor replays from index 1; replayed records match the
        // stored fileHash and count as success without inserting.
        let doc = state.get_job("job1").await.unwrap().unwrap();
        let mut stale = doc.clone();
        stale.status = JobStatus::Cancelled;
        stale.processed_records = 1;
        stale.success_count = 1;
        stale.fail_count = 0;
        stale.last_processed_index = 0;
        state.put_job("job1", &stale).await.unwrap();

        engine.run(THREE_VALID, "hash1", "job1", 1).await.unwrap();

        let resumed = state.get_job("job1").await.unwrap().unwrap();
        assert_eq!(resumed.success_count, 3);
        assert_eq!(resumed.fail_count, 0);
        assert_eq!(records.len(), 3);
    }

    #[tokio::test]
    async fn test_injected_faults_counted_and_logged() {
        struct AlwaysFail;
        impl FaultInjector for AlwaysFail {
            fn should_fail(&self) -> bool {
                true
            }
        }

        let records = Arc::new(MemoryRecordStore::new());
        let state = Arc::new(MemoryJobStateStore::new());
        let engine =
            IngestionEngine::new(records.clone(), state.clone(), Arc::new(AlwaysFail));

        engine.run(THREE_VALID, "hash1", "job1", 0).await.unwrap();

        let doc = state.get_job("job1").await.unwrap().unwrap();
        assert_eq!(doc.status, JobStatus::Completed);
        assert_eq!(doc.success_count, 0);
        assert_eq!(doc.fail_count, 3);
        assert!(records.is_empty());
        assert!(records
            .failures()
            .iter()
            .all(|f| f.error == "Random failure for testing"));
    }

    #[tokio::test]
    async fn test_malformed_row_counted_not_fatal() {
        let records = Arc::new(MemoryRecordStore::new());
        let state = Arc::new(MemoryJobStateStore::new());
        let engine = engine_with(records.clone(), state.clone());

        let buffer = b"name,email\nAda,ada@example.com,extra\nCharles,charles@example.com\n";
        engine.run(buffer, "hash1", "job1", 0).await.unwrap();

        let doc = state.get_job("job1").await.unwrap().unwrap();
        assert_eq!(doc.status, JobStatus::Completed);
        assert_eq!(doc.total_records, 2);
        assert_eq!(doc.success_count, 1);
        assert_eq!(doc.fail_count, 1);
    }

    #[tokio::test]
    async fn test_empty_file_completes_immediately() {
        let records = Arc::new(MemoryRecordStore::new());
        let state = Arc::new(MemoryJobStateStore::new());
        let engine = engine_with(records.clone(), state.clone());

        let outcome = engine.run(b"name,email\n", "hash1", "job1", 0).await.unwrap();
        assert_eq!(outcome, RunOutcome::Completed);

        let doc = state.get_job("job1").await.unwrap().unwrap();
        assert_eq!(doc.total_records, 0);
        assert_eq!(doc.processed_records, 0);
        assert_eq!(doc.last_processed_index, -1);
    }
}
