//! Redis-backed job state store

mod redis_store;

pub use redis_store::RedisJobStateStore;
