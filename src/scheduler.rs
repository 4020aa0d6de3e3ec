//! The scheduler core: validates repeat options, advances schedules,
//! and materializes the next instance of each.

use std::sync::Arc;

use deadpool_redis::Pool;
use futures::future::join_all;
use serde_json::Value;
use tracing::{info_span, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::SchedulerConfig;
use crate::definition::{SchedulerDefinition, SchedulerJson};
use crate::error::{SchedulerError, SchedulerResult};
use crate::instance::{build_instance, JobTemplateOptions};
use crate::keys::SchedulerKeys;
use crate::metrics::SchedulerMetrics;
use crate::redis::scripts::{count_index, get_job_scheduler, list_index, SchedulerScripts};
use crate::repeat::{default_strategy_for, RepeatOptions, RepeatStrategy};

/// Everything needed to upsert one scheduler.
pub struct UpsertRequest {
    pub scheduler_id: String,
    pub repeat: RepeatOptions,
    pub job_name: String,
    pub data: Value,
    pub template: JobTemplateOptions,
    /// `true` rewrites the full definition; `false` only advances the
    /// index score of an existing definition.
    pub override_definition: bool,
    /// Overrides the default strategy selection (interval vs. pattern).
    pub strategy: Option<Arc<dyn RepeatStrategy>>,
}

impl UpsertRequest {
    /// Convenience constructor for the common override-mode case.
    pub fn new(scheduler_id: impl Into<String>, repeat: RepeatOptions, job_name: impl Into<String>, data: Value) -> Self {
        Self {
            scheduler_id: scheduler_id.into(),
            repeat,
            job_name: job_name.into(),
            data,
            template: JobTemplateOptions::default(),
            override_definition: true,
            strategy: None,
        }
    }
}

/// Handle to the job instance produced by a successful upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledJobHandle {
    pub job_id: String,
    pub scheduler_id: String,
    pub next_fire_ms: i64,
    pub delay_ms: i64,
}

/// The repeatable job scheduler.
pub struct JobScheduler {
    pool: Pool,
    keys: SchedulerKeys,
    scripts: SchedulerScripts,
    clock: Arc<dyn Clock>,
    default_limit: Option<u64>,
}

impl JobScheduler {
    /// Builds a scheduler backed by `pool`, using the system wall clock.
    pub fn new(pool: Pool, config: &SchedulerConfig) -> Self {
        Self::with_clock(pool, config, Arc::new(SystemClock))
    }

    /// Builds a scheduler with an injected clock, for deterministic tests.
    pub fn with_clock(pool: Pool, config: &SchedulerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool,
            keys: SchedulerKeys::new(config.key_prefix.clone()),
            scripts: SchedulerScripts::new(),
            clock,
            default_limit: config.default_limit,
        }
    }

    /// Advances `scheduler_id` by one tick and materializes its next
    /// instance, per the upsert algorithm. Returns `None` when the
    /// schedule is a no-op this call: the iteration limit was reached,
    /// `endDate` has passed, or the strategy reports the schedule dead.
    pub async fn upsert(&self, req: UpsertRequest) -> SchedulerResult<Option<ScheduledJobHandle>> {
        req.repeat.validate().map_err(SchedulerError::Validation)?;

        if req.repeat.immediately && req.repeat.every.is_some() {
            warn!(
                scheduler_id = %req.scheduler_id,
                "`immediately` has no effect combined with a fixed `every` interval after the first fire"
            );
        }

        let iteration_count = req.repeat.count.unwrap_or(0) + 1;
        if let Some(limit) = req.repeat.limit.or(self.default_limit) {
            if iteration_count > limit {
                SchedulerMetrics::dead_schedule(&req.job_name);
                return Ok(None);
            }
        }

        let mut now = self.clock.now_ms();

        // endDate is an inclusive upper bound: once `now` has passed
        // it, the schedule is dead for good. (See design notes: the
        // original description of this check was ambiguous to the
        // point of never firing; this implements the intended guard.)
        if let Some(end_date) = req.repeat.end_date {
            if now > end_date {
                SchedulerMetrics::dead_schedule(&req.job_name);
                return Ok(None);
            }
        }

        if let Some(start_date) = req.repeat.start_date {
            now = now.max(start_date);
        }
        let prev_millis = req.template.prev_millis.unwrap_or(0);
        now = now.max(prev_millis);

        let strategy = req
            .strategy
            .clone()
            .unwrap_or_else(|| default_strategy_for(&req.repeat));

        let Some(next_fire) = strategy.next_fire(now, prev_millis, &req.repeat, &req.job_name) else {
            SchedulerMetrics::dead_schedule(&req.job_name);
            return Ok(None);
        };

        let data_json = serde_json::to_string(&req.data)?;
        let creation_now = self.clock.now_ms();
        let instance = build_instance(
            &req.scheduler_id,
            next_fire.next_fire_ms,
            creation_now,
            &req.job_name,
            &data_json,
            &req.repeat,
            next_fire.offset,
            iteration_count,
            &req.template,
        );

        let span = info_span!(
            "add",
            queue = %req.job_name,
            "scheduler.id" = %req.scheduler_id,
            "job.id" = %instance.job_id
        );
        let _entered = span.enter();

        let mut conn = self.pool.get().await?;

        let job_id = if req.override_definition {
            let opts_json = serde_json::to_string(&req.template)?;
            let definition = SchedulerDefinition {
                name: req.job_name.clone(),
                end_date: req.repeat.end_date,
                tz: req.repeat.tz.clone(),
                pattern: req.repeat.pattern.clone(),
                every: req.repeat.every,
                data: data_json,
                opts: opts_json,
            };
            self.scripts
                .add_job_scheduler(
                    &mut conn,
                    &self.keys,
                    &req.scheduler_id,
                    next_fire.next_fire_ms,
                    &definition,
                    &instance,
                )
                .await?
        } else {
            self.scripts
                .update_next_millis(&mut conn, &self.keys, &req.scheduler_id, next_fire.next_fire_ms, &instance)
                .await?
        };

        SchedulerMetrics::upsert_committed(&req.job_name);
        SchedulerMetrics::instance_enqueued(&req.job_name);

        Ok(Some(ScheduledJobHandle {
            job_id,
            scheduler_id: req.scheduler_id,
            next_fire_ms: next_fire.next_fire_ms,
            delay_ms: instance.delay,
        }))
    }

    /// Removes a scheduler's index entry and definition. Returns the
    /// number of entities removed (0 or 1).
    pub async fn remove(&self, scheduler_id: &str) -> SchedulerResult<i64> {
        let mut conn = self.pool.get().await?;
        self.scripts.remove_job_scheduler(&mut conn, &self.keys, scheduler_id).await
    }

    /// Fetches a single scheduler's descriptor. If the definition hash
    /// is absent but `raw_id` itself is a legacy colon-delimited
    /// descriptor (`name:id:endDate:tz:pattern`), synthesizes a minimal
    /// descriptor from it instead of reporting not-found.
    pub async fn get(&self, raw_id: &str) -> SchedulerResult<Option<SchedulerJson>> {
        let mut conn = self.pool.get().await?;
        let (definition, next) = get_job_scheduler(&mut conn, &self.keys, raw_id).await?;

        if let Some(def) = definition {
            return Ok(Some(SchedulerJson::from_definition(raw_id, &def, next)));
        }

        if raw_id.contains(':') {
            if let Some(legacy) = SchedulerJson::from_legacy_descriptor(raw_id, next) {
                let (_, legacy_next) = get_job_scheduler(&mut conn, &self.keys, &legacy.id).await?;
                return Ok(Some(SchedulerJson {
                    next: legacy_next.or(next),
                    ..legacy
                }));
            }
        }

        Ok(None)
    }

    /// Lists schedulers in the index, ordered by next-fire score.
    pub async fn list(&self, start: isize, end: isize, ascending: bool) -> SchedulerResult<Vec<SchedulerJson>> {
        let mut conn = self.pool.get().await?;
        let entries = list_index(&mut conn, &self.keys, start, end, ascending).await?;

        let fetches = entries.into_iter().map(|(id, score)| {
            let pool = self.pool.clone();
            let keys = self.keys.clone();
            async move {
                let mut conn = pool.get().await.ok()?;
                let (definition, _) = get_job_scheduler(&mut conn, &keys, &id).await.ok()?;
                definition.map(|def| SchedulerJson::from_definition(&id, &def, Some(score)))
            }
        });

        Ok(join_all(fetches).await.into_iter().flatten().collect())
    }

    /// Cardinality of the scheduler index.
    pub async fn count(&self) -> SchedulerResult<u64> {
        let mut conn = self.pool.get().await?;
        count_index(&mut conn, &self.keys).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deadpool_redis::{Config, Runtime};

    #[test]
    fn upsert_request_defaults_to_override() {
        let req = UpsertRequest::new("s1", RepeatOptions::default(), "job", Value::Null);
        assert!(req.override_definition);
        assert!(req.strategy.is_none());
    }

    /// Building a pool does not connect; the horizon checks below run
    /// before the scheduler ever calls `pool.get()`, so no live Redis
    /// is required to exercise them.
    fn unconnected_pool() -> Pool {
        Config::from_url("redis://127.0.0.1:1")
            .builder()
            .unwrap()
            .runtime(Runtime::Tokio1)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn upsert_is_a_noop_past_limit() {
        let scheduler = JobScheduler::with_clock(
            unconnected_pool(),
            &SchedulerConfig {
                key_prefix: "test".into(),
                default_limit: None,
            },
            Arc::new(crate::clock::FixedClock::new(1_000)),
        );

        let req = UpsertRequest::new(
            "s1",
            RepeatOptions {
                every: Some(1000),
                limit: Some(2),
                count: Some(2),
                ..Default::default()
            },
            "job",
            Value::Null,
        );

        let result = scheduler.upsert(req).await.expect("should not error");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn upsert_is_a_noop_past_end_date() {
        let scheduler = JobScheduler::with_clock(
            unconnected_pool(),
            &SchedulerConfig {
                key_prefix: "test".into(),
                default_limit: None,
            },
            Arc::new(crate::clock::FixedClock::new(2_000)),
        );

        let req = UpsertRequest::new(
            "s1",
            RepeatOptions {
                every: Some(1000),
                end_date: Some(1_000),
                ..Default::default()
            },
            "job",
            Value::Null,
        );

        let result = scheduler.upsert(req).await.expect("should not error");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn upsert_is_a_noop_when_strategy_is_dead() {
        let scheduler = JobScheduler::with_clock(
            unconnected_pool(),
            &SchedulerConfig {
                key_prefix: "test".into(),
                default_limit: None,
            },
            Arc::new(crate::clock::FixedClock::new(1_000)),
        );

        let req = UpsertRequest::new(
            "s1",
            RepeatOptions {
                pattern: Some("not a cron expression".into()),
                ..Default::default()
            },
            "job",
            Value::Null,
        );

        let result = scheduler.upsert(req).await.expect("should not error");
        assert!(result.is_none());
    }
}
