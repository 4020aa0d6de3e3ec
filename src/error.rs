//! Scheduler error types.

use thiserror::Error;

/// Result type for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Errors produced by the job scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Caller-supplied `RepeatOptions` violated a validation rule
    /// (e.g. both `every` and `pattern` set, or neither).
    #[error("validation error: {0}")]
    Validation(String),

    /// One of the atomic scripts failed mid-transaction.
    #[error("error upserting job scheduler {scheduler_id} - {source}")]
    Transaction {
        scheduler_id: String,
        source: String,
    },

    /// The enqueuer rejected a duplicate deterministic job id, almost
    /// always the result of a racing concurrent upsert on the same id.
    #[error("duplicate scheduler instance: {job_id}")]
    DuplicateInstance { job_id: String },

    /// Serialization/deserialization of stored definitions failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Redis command-level error.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Redis connection pool error.
    #[error("redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    /// Requested scheduler id has no definition.
    #[error("scheduler not found: {0}")]
    NotFound(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl SchedulerError {
    /// Whether the failure is transient store-layer trouble a caller
    /// may reasonably retry, as opposed to a business-rule rejection.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SchedulerError::Redis(_) | SchedulerError::Pool(_))
    }
}
