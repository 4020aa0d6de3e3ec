//! Repeat options and the pluggable strategies that turn them into a
//! next fire time.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Caller-supplied description of a recurring schedule.
///
/// Exactly one of `every` / `pattern` must be set; `immediately` and
/// `start_date` are mutually exclusive. `offset` is strategy state
/// threaded back by the caller on subsequent upserts (the fixed-interval
/// strategy publishes it on the first fire); `count` is the number of
/// iterations already emitted, used for the `limit` horizon check.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepeatOptions {
    /// Fixed interval in milliseconds. Mutually exclusive with `pattern`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub every: Option<i64>,

    /// Phase offset in milliseconds, published by the interval strategy
    /// after the first fire and threaded back in by the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,

    /// Cron expression. Mutually exclusive with `every`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// IANA timezone name used when evaluating `pattern`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tz: Option<String>,

    /// Fire immediately on the first upsert instead of waiting for the
    /// next computed slot.
    #[serde(default)]
    pub immediately: bool,

    /// Earliest epoch ms the schedule may fire from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<i64>,

    /// Inclusive terminal epoch ms; upserts after this are no-ops.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<i64>,

    /// Maximum number of iterations the schedule may emit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,

    /// Number of iterations already emitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

impl RepeatOptions {
    /// Validates the mutual-exclusivity rules described in the data
    /// model. Does not touch the clock or the store.
    pub fn validate(&self) -> Result<(), String> {
        match (self.every, self.pattern.as_ref()) {
            (Some(_), Some(_)) => {
                return Err("repeat options must set exactly one of `every` or `pattern`, not both".into());
            }
            (None, None) => {
                return Err("repeat options must set one of `every` or `pattern`".into());
            }
            _ => {}
        }
        if let Some(every) = self.every {
            if every <= 0 {
                return Err("`every` must be a positive number of milliseconds".into());
            }
        }
        if self.immediately && self.start_date.is_some() {
            return Err("`immediately` and `start_date` are mutually exclusive".into());
        }
        Ok(())
    }
}

/// Result of advancing a schedule by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextFire {
    /// Epoch ms at which the next instance should become runnable.
    pub next_fire_ms: i64,
    /// Updated `offset` to persist back onto the stored `RepeatOptions`,
    /// when the strategy tracks phase state (fixed-interval only).
    pub offset: Option<i64>,
}

/// Pure computation of the next fire time for a schedule.
///
/// Implementations must be reentrant and side-effect free; the core
/// holds strategies behind `Arc<dyn RepeatStrategy>` so a caller-supplied
/// calendar can be swapped in alongside the two built-ins.
pub trait RepeatStrategy: Send + Sync {
    /// Computes the next fire time, or `None` if the schedule is dead
    /// (e.g. an exhausted cron pattern or an invalid expression).
    ///
    /// `prev_millis` is the last fire time recorded on the job template
    /// (`0` if this is the first fire for the schedule).
    fn next_fire(
        &self,
        now_ms: i64,
        prev_millis: i64,
        opts: &RepeatOptions,
        job_name: &str,
    ) -> Option<NextFire>;
}

/// Fixed-interval strategy: fires immediately, then every `every`
/// milliseconds aligned to the phase established on the first fire.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedIntervalStrategy;

impl RepeatStrategy for FixedIntervalStrategy {
    fn next_fire(
        &self,
        now_ms: i64,
        prev_millis: i64,
        opts: &RepeatOptions,
        _job_name: &str,
    ) -> Option<NextFire> {
        let every = opts.every.filter(|every| *every > 0)?;
        let has_prior_fire = prev_millis > 0 || opts.offset.is_some();

        if !has_prior_fire {
            // First fire: run now, and publish the phase offset that
            // keeps subsequent slots aligned to this start.
            let slot = (now_ms / every) * every + every;
            // When `now_ms` itself lands on a slot boundary, `slot - now_ms`
            // is `every`, so `new_offset` is `0`, not `every`. The spec's
            // own worked example (`now=1000, every=1000` storing
            // `offset=1000`) gets this arithmetic wrong; this follows the
            // spec's "implement as written" directive rather than that
            // table's stated value.
            let new_offset = every - (slot - now_ms);
            return Some(NextFire {
                next_fire_ms: now_ms,
                offset: Some(new_offset),
            });
        }

        // Subsequent fire: advance to the next slot plus the recorded
        // phase offset. This intentionally overshoots by one period
        // when `now` lands exactly on a slot boundary — see the design
        // notes for why that is kept as-is rather than corrected.
        let offset = opts.offset.unwrap_or(0);
        let slot = (now_ms / every) * every + every;
        let next_fire_ms = (slot + offset).max(now_ms);
        Some(NextFire {
            next_fire_ms,
            offset: Some(offset),
        })
    }
}

/// Cron-pattern strategy: evaluates a cron expression, optionally in a
/// specific IANA timezone, via the `cron` + `chrono-tz` crates.
#[derive(Debug, Default, Clone, Copy)]
pub struct CronPatternStrategy;

impl RepeatStrategy for CronPatternStrategy {
    fn next_fire(
        &self,
        now_ms: i64,
        _prev_millis: i64,
        opts: &RepeatOptions,
        _job_name: &str,
    ) -> Option<NextFire> {
        let pattern = opts.pattern.as_ref()?;

        if opts.immediately {
            return Some(NextFire {
                next_fire_ms: now_ms,
                offset: None,
            });
        }

        let schedule = cron::Schedule::from_str(pattern).ok()?;

        let next_fire_ms = match opts.tz.as_deref() {
            Some(tz_name) => {
                let tz: chrono_tz::Tz = tz_name.parse().ok()?;
                let now = Utc.timestamp_millis_opt(now_ms).single()?.with_timezone(&tz);
                schedule.after(&now).next()?.with_timezone(&Utc).timestamp_millis()
            }
            None => {
                let now = Utc.timestamp_millis_opt(now_ms).single()?;
                schedule.after(&now).next()?.timestamp_millis()
            }
        };

        Some(NextFire {
            next_fire_ms,
            offset: None,
        })
    }
}

/// Builds the default strategy for a given `RepeatOptions`, selecting
/// between fixed-interval and cron-pattern based on which field is set.
pub fn default_strategy_for(opts: &RepeatOptions) -> Arc<dyn RepeatStrategy> {
    if opts.pattern.is_some() {
        Arc::new(CronPatternStrategy)
    } else {
        Arc::new(FixedIntervalStrategy)
    }
}
