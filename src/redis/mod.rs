//! Redis-backed storage for the scheduler.

pub mod enqueuer;
pub mod scripts;

pub use enqueuer::RedisEnqueuer;
pub use scripts::SchedulerScripts;

use deadpool_redis::{Config, Pool, Runtime};
use tracing::info;

use crate::config::RedisConfig;
use crate::error::{SchedulerError, SchedulerResult};

/// Creates and pings a Redis connection pool.
pub async fn create_pool(config: &RedisConfig) -> SchedulerResult<Pool> {
    info!(url = %config.url, pool_size = config.pool_size, "creating redis connection pool");

    let cfg = Config::from_url(&config.url);

    let pool = cfg
        .builder()
        .map_err(|e| SchedulerError::Configuration(format!("invalid redis config: {e}")))?
        .max_size(config.pool_size)
        .runtime(Runtime::Tokio1)
        .build()
        .map_err(|e| SchedulerError::Configuration(format!("failed to create pool: {e}")))?;

    let mut conn = pool.get().await?;
    redis::cmd("PING").query_async::<String>(&mut *conn).await?;

    info!("redis connection pool created successfully");

    Ok(pool)
}
