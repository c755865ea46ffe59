//! Bulkload Ingestion Engine
//!
//! The core of the bulkload service: a resumable, cancellable ingestion job
//! engine that streams name/email records from an uploaded CSV buffer and
//! processes each one against a durable record store while checkpointing
//! progress to a job state store.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐   ┌──────────────────┐   ┌───────────────────┐
//! │ RecordSource  │──▶│ IngestionEngine  │──▶│ RecordStore       │
//! │ (CSV decode)  │   │ validate/dedup/  │   │ (postgres/memory) │
//! └───────────────┘   │ insert + counters│   └───────────────────┘
//!                     │        │         │
//!                     │        ▼         │   ┌───────────────────┐
//!                     │  checkpoints ────┼──▶│ JobStateStore     │
//!                     │  cancel polling ◀┼───│ (redis/memory)    │
//!                     └──────────────────┘   └───────────────────┘
//! ```
//!
//! The stores are trait objects so the HTTP server can wire Postgres and
//! Redis backends while tests and local development run entirely in memory.
//! Processing is strictly sequential per job: dedup-by-email correctness
//! depends on observing prior inserts within the same run in order.

pub mod engine;
pub mod fault;
pub mod memory;
pub mod source;
pub mod state;
pub mod store;

pub use engine::{EngineError, IngestionEngine, RunOutcome, DEFAULT_CHECKPOINT_INTERVAL};
pub use fault::{FaultInjector, NoFaults, RandomFaults, DEFAULT_FAULT_PROBABILITY};
pub use source::{RawRecord, RecordSource};
pub use state::{JobDocument, JobStateStore, JobStatus, StateStoreError};
pub use store::{FailedRecord, NewRecord, RecordStore, RecordStoreError, StoredRecord};
