//! The narrow collaborator interface the scheduler needs from the
//! delayed-job queue it does not own.
//!
//! Production upserts fuse schedule-advance and instance-enqueue into a
//! single Lua script (see [`crate::redis::scripts`]); this trait exists
//! to document that contract and to let the core be exercised against a
//! fake in tests without a live Redis connection.

use async_trait::async_trait;

use crate::error::SchedulerResult;
use crate::instance::NextInstance;

/// Accepts a concrete job instance into the delayed queue.
#[async_trait]
pub trait Enqueuer: Send + Sync {
    /// Submits `instance` for delayed execution and returns the job id
    /// the queue assigned (ordinarily `instance.job_id` unchanged).
    async fn add_job(&self, instance: &NextInstance) -> SchedulerResult<String>;
}
