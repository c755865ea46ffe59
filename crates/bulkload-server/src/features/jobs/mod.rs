//! Ingestion job feature
//!
//! Upload handling, job status queries, and the cancel/resume control
//! surface around the ingestion engine.

pub mod commands;
pub mod queries;
pub mod routes;

pub use routes::jobs_routes;
