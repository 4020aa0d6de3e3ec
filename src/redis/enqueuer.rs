//! Minimal Redis-backed [`Enqueuer`](crate::enqueuer::Enqueuer)
//! implementation.
//!
//! Production upserts never call this directly — the scheduler core
//! fuses the enqueue into the same Lua script as the schedule advance
//! (see [`super::scripts`]) so the two cannot diverge under a crash
//! between steps. This type exists so the `Enqueuer` trait boundary is
//! backed by something real, and so callers who only need "push one
//! instance" outside of a scheduler upsert have a concrete option.

use async_trait::async_trait;
use deadpool_redis::Pool;

use crate::enqueuer::Enqueuer;
use crate::error::SchedulerResult;
use crate::instance::NextInstance;
use crate::keys::SchedulerKeys;

pub struct RedisEnqueuer {
    pool: Pool,
    keys: SchedulerKeys,
}

impl RedisEnqueuer {
    pub fn new(pool: Pool, keys: SchedulerKeys) -> Self {
        Self { pool, keys }
    }
}

#[async_trait]
impl Enqueuer for RedisEnqueuer {
    async fn add_job(&self, instance: &NextInstance) -> SchedulerResult<String> {
        let mut conn = self.pool.get().await?;
        let instance_json = serde_json::to_string(instance)?;
        let job_hash_key = format!("{}:job:{}", self.keys.prefix(), instance.job_id);
        let delayed_key = format!("{}:delayed", self.keys.prefix());

        let _: () = redis::pipe()
            .atomic()
            .hset(&job_hash_key, "data", &instance_json)
            .zadd(&delayed_key, &instance.job_id, instance.timestamp + instance.delay)
            .query_async(&mut *conn)
            .await?;

        Ok(instance.job_id.clone())
    }
}
