//! Job commands (write operations)

pub mod cancel;
pub mod create;
pub mod resume;

pub use cancel::{CancelJobCommand, CancelJobError};
pub use create::{CreateJobCommand, CreateJobError};
pub use resume::{ResumeJobCommand, ResumeJobError};
