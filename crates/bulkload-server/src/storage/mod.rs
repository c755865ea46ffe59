//! Upload file storage
//!
//! Raw upload bytes are retained on local disk as `{dir}/{job_id}.csv`
//! for the lifetime of the job, because resume re-reads the original file.

use std::io;
use std::path::PathBuf;

/// Local-disk store for uploaded files, keyed by job id.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Ensure the upload directory exists.
    pub async fn init(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    /// Persist the raw bytes of an upload.
    pub async fn save(&self, job_id: &str, bytes: &[u8]) -> io::Result<()> {
        tokio::fs::write(self.path(job_id)?, bytes).await
    }

    /// Reload the original bytes for a resume.
    pub async fn load(&self, job_id: &str) -> io::Result<Vec<u8>> {
        tokio::fs::read(self.path(job_id)?).await
    }

    fn path(&self, job_id: &str) -> io::Result<PathBuf> {
        // Job ids are server-generated UUIDs, but load() receives the id
        // from the request path; refuse anything that could escape dir.
        if job_id.is_empty()
            || job_id.contains('/')
            || job_id.contains('\\')
            || job_id.contains("..")
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid job id: {job_id}"),
            ));
        }
        Ok(self.dir.join(format!("{job_id}.csv")))
    }
}
