//! Postgres implementation of the record store gateway
//!
//! Records are keyed by a unique index on email; the unique-violation
//! error code (23505) maps to the benign `Duplicate` variant so the engine
//! can treat insert races from concurrent resume attempts as successes.

use async_trait::async_trait;
use sqlx::PgPool;

use bulkload_engine::store::{
    FailedRecord, NewRecord, RecordStore, RecordStoreError, StoredRecord,
};

const PG_UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Clone, sqlx::FromRow)]
struct RecordRow {
    name: String,
    email: String,
    file_hash: String,
    job_id: String,
}

impl From<RecordRow> for StoredRecord {
    fn from(row: RecordRow) -> Self {
        StoredRecord {
            name: row.name,
            email: row.email,
            file_hash: row.file_hash,
            job_id: row.job_id,
        }
    }
}

/// Record store over a Postgres connection pool.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn unavailable(err: sqlx::Error) -> RecordStoreError {
    RecordStoreError::Unavailable(err.to_string())
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<StoredRecord>, RecordStoreError> {
        let row = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT name, email, file_hash, job_id
            FROM records
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(row.map(StoredRecord::from))
    }

    async fn insert(&self, record: &NewRecord) -> Result<(), RecordStoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO records (name, email, file_hash, job_id)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&record.name)
        .bind(&record.email)
        .bind(&record.file_hash)
        .bind(&record.job_id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err))
                if db_err.code().as_deref() == Some(PG_UNIQUE_VIOLATION) =>
            {
                Err(RecordStoreError::Duplicate(record.email.clone()))
            },
            Err(err) => Err(unavailable(err)),
        }
    }

    async fn append_failure(&self, failure: &FailedRecord) -> Result<(), RecordStoreError> {
        sqlx::query(
            r#"
            INSERT INTO failed_records (name, email, error, job_id)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&failure.name)
        .bind(&failure.email)
        .bind(&failure.error)
        .bind(&failure.job_id)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(())
    }
}
