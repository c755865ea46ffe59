//! Redis implementation of the job state store
//!
//! Two key families per job id: `job:{id}` holds the JSON status document
//! (last-writer-wins SET), `job:{id}:cancelled` is the presence-only
//! cancellation marker. The listing enumerates `job:*` and filters out
//! marker keys; acceptable at the small job counts this service targets.

use async_trait::async_trait;
use redis::AsyncCommands;
use std::collections::HashMap;

use bulkload_engine::state::{JobDocument, JobStateStore, StateStoreError};

const JOB_KEY_PREFIX: &str = "job:";
const CANCEL_KEY_SUFFIX: &str = ":cancelled";

fn job_key(job_id: &str) -> String {
    format!("{JOB_KEY_PREFIX}{job_id}")
}

fn cancel_key(job_id: &str) -> String {
    format!("{JOB_KEY_PREFIX}{job_id}{CANCEL_KEY_SUFFIX}")
}

fn unavailable(err: redis::RedisError) -> StateStoreError {
    StateStoreError::Unavailable(err.to_string())
}

/// Job state store over a multiplexed Redis connection.
#[derive(Clone)]
pub struct RedisJobStateStore {
    conn: redis::aio::MultiplexedConnection,
}

impl RedisJobStateStore {
    /// Connect to Redis at the given URL.
    pub async fn connect(url: &str) -> Result<Self, StateStoreError> {
        let client = redis::Client::open(url).map_err(unavailable)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(unavailable)?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl JobStateStore for RedisJobStateStore {
    async fn get_job(&self, job_id: &str) -> Result<Option<JobDocument>, StateStoreError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(job_key(job_id)).await.map_err(unavailable)?;

        match value {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn put_job(&self, job_id: &str, document: &JobDocument) -> Result<(), StateStoreError> {
        let json = serde_json::to_string(document)?;
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(job_key(job_id), json)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn list_jobs(&self) -> Result<HashMap<String, JobDocument>, StateStoreError> {
        let mut conn = self.conn.clone();
        let keys: Vec<String> = conn
            .keys(format!("{JOB_KEY_PREFIX}*"))
            .await
            .map_err(unavailable)?;

        let mut jobs = HashMap::new();
        for key in keys {
            if key.ends_with(CANCEL_KEY_SUFFIX) {
                continue;
            }
            let value: Option<String> = conn.get(&key).await.map_err(unavailable)?;
            if let Some(json) = value {
                let job_id = key.trim_start_matches(JOB_KEY_PREFIX).to_string();
                jobs.insert(job_id, serde_json::from_str(&json)?);
            }
        }
        Ok(jobs)
    }

    async fn set_cancel_marker(&self, job_id: &str) -> Result<(), StateStoreError> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(cancel_key(job_id), "1")
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn cancel_requested(&self, job_id: &str) -> Result<bool, StateStoreError> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.exists(cancel_key(job_id)).await.map_err(unavailable)?;
        Ok(exists)
    }

    async fn clear_cancel_marker(&self, job_id: &str) -> Result<(), StateStoreError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(cancel_key(job_id)).await.map_err(unavailable)?;
        Ok(())
    }
}
