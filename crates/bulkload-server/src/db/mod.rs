//! Postgres-backed record store

mod records;

pub use records::PgRecordStore;
