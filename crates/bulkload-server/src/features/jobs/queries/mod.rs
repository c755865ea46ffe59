//! Job queries (read operations)

pub mod get_job;
pub mod list_jobs;

pub use get_job::{GetJobError, GetJobQuery};
pub use list_jobs::{ListJobsError, ListJobsQuery};
