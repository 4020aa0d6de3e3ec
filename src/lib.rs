//! Repeatable Jobs - a Redis-backed scheduler for recurring jobs
//!
//! Materializes repeating job definitions into concrete, individually
//! executable instances on a delayed queue: a single `upsert` call
//! validates a repeat schedule, computes the next fire time, and
//! atomically advances the schedule's index entry while enqueuing the
//! instance for that fire — all as one Redis transaction.
//!
//! - Fixed-interval and cron-pattern (with IANA timezone) repeat strategies
//! - Deterministic instance ids (`repeat:<id>:<nextFireMs>`) as the
//!   dedup primitive under concurrent upserts
//! - Atomic Redis Lua scripts fuse schedule-advance with instance-enqueue
//! - Read APIs over the live scheduler set: `get`, `list`, `count`
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                    Repeatable Jobs Architecture                │
//! ├───────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  Caller                                                        │
//! │    │ upsert(id, RepeatOptions, jobName, data, template)        │
//! │    ▼                                                           │
//! │  ┌───────────────────────────────────────────────────────┐    │
//! │  │                   JobScheduler                         │    │
//! │  │  validate → horizon checks → start alignment           │    │
//! │  │       → RepeatStrategy.next_fire() → InstanceBuilder   │    │
//! │  └───────────────────────┬─────────────────────────────────┘    │
//! │                          │ one atomic Lua script                │
//! │                          ▼                                      │
//! │  ┌───────────────────────────────────────────────────────┐    │
//! │  │                     Redis                               │    │
//! │  │  ┌────────────┐  ┌────────────────┐  ┌───────────────┐ │    │
//! │  │  │ repeat      │  │ repeat:<id>     │  │ :delayed      │ │    │
//! │  │  │ (index zset)│  │ (definition hash)│  │ (instance set)│ │    │
//! │  │  └────────────┘  └────────────────┘  └───────────────┘ │    │
//! │  └───────────────────────────────────────────────────────┘    │
//! │                          │                                      │
//! │                          ▼                                      │
//! │              worker pool / dispatcher (out of scope)            │
//! │                                                                 │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use repeatable_jobs::{JobScheduler, RepeatOptions, UpsertRequest};
//! use serde_json::json;
//!
//! let req = UpsertRequest::new(
//!     "daily-report",
//!     RepeatOptions { every: Some(86_400_000), ..Default::default() },
//!     "generate-report",
//!     json!({ "report": "daily" }),
//! );
//!
//! if let Some(handle) = scheduler.upsert(req).await? {
//!     println!("next instance: {} in {}ms", handle.job_id, handle.delay_ms);
//! }
//! ```

pub mod clock;
pub mod config;
pub mod definition;
pub mod di;
pub mod enqueuer;
pub mod error;
pub mod instance;
pub mod keys;
pub mod metrics;
pub mod redis;
pub mod repeat;
pub mod scheduler;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{JobSchedulerConfig, RedisConfig, SchedulerConfig};
pub use definition::{SchedulerDefinition, SchedulerJson};
pub use di::SchedulerInterface;
pub use enqueuer::Enqueuer;
pub use error::{SchedulerError, SchedulerResult};
pub use instance::{build_instance, JobTemplateOptions, NextInstance, RepeatMeta};
pub use keys::SchedulerKeys;
pub use metrics::{register_metrics, SchedulerMetrics};
pub use redis::{create_pool, RedisEnqueuer, SchedulerScripts};
pub use repeat::{default_strategy_for, CronPatternStrategy, FixedIntervalStrategy, NextFire, RepeatOptions, RepeatStrategy};
pub use scheduler::{JobScheduler, ScheduledJobHandle, UpsertRequest};

/// Re-export of the commonly used types.
pub mod prelude {
    pub use crate::clock::{Clock, SystemClock};
    pub use crate::error::{SchedulerError, SchedulerResult};
    pub use crate::repeat::RepeatOptions;
    pub use crate::scheduler::{JobScheduler, ScheduledJobHandle, UpsertRequest};
}
