//! Bulkload Server Library
//!
//! HTTP server around the resumable ingestion engine.
//!
//! # Overview
//!
//! The server accepts bulk CSV uploads of name/email records, runs each
//! upload as a background ingestion job, and exposes job progress and
//! control over a small REST API:
//!
//! - `POST /api/upload` — create a job from an uploaded file
//! - `GET /api/jobs` — list all jobs with their progress documents
//! - `GET /api/jobs/:job_id` — fetch one job's progress document
//! - `POST /api/jobs/:job_id/cancel` — request cooperative cancellation
//! - `POST /api/jobs/:job_id/resume` — resume a cancelled job
//!
//! # Architecture
//!
//! Features follow a vertical-slice CQRS layout: each slice owns its
//! `commands/` (state-changing operations), `queries/` (reads), and
//! `routes.rs`. Commands and queries implement the mediator pattern via
//! the `mediator` crate.
//!
//! Storage backends are pluggable behind the engine's traits: Postgres
//! (sqlx) holds ingested records and the failure log, Redis holds the
//! per-job status documents and cancellation markers, and the raw upload
//! bytes live on local disk so cancelled jobs can be resumed later.

pub mod config;
pub mod db;
pub mod features;
pub mod middleware;
pub mod state;
pub mod storage;
