//! Bulkload Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared utilities and error handling for the bulkload workspace.
//!
//! # Overview
//!
//! This crate provides common functionality used across all bulkload
//! workspace members:
//!
//! - **Error Handling**: Custom error types and result types
//! - **Checksums**: File fingerprinting (sha256) for upload identity
//! - **Logging**: Centralized tracing initialization
//!
//! # Example
//!
//! ```no_run
//! use bulkload_common::checksum::fingerprint;
//!
//! let hash = fingerprint(b"name,email\nAda,ada@example.com\n");
//! println!("File fingerprint: {}", hash);
//! ```

pub mod checksum;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{BulkloadError, Result};
