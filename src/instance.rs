//! Instance Builder: turns a computed fire time into a concrete job
//! record ready for the delayed queue.

use serde::{Deserialize, Serialize};
use serde_json::Map;

use crate::keys::SchedulerKeys;
use crate::repeat::RepeatOptions;

/// Per-call job template options (everything about the instance that
/// isn't derived from the schedule itself). `prev_millis` feeds the
/// start-alignment step in the core upsert algorithm; `extra` carries
/// opaque pass-through fields (e.g. priority) merged verbatim onto the
/// constructed instance's options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobTemplateOptions {
    /// Last fire time recorded for this schedule, or `0`/`None` on the
    /// first call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_millis: Option<i64>,

    /// Opaque, pass-through job options merged into the instance.
    #[serde(flatten)]
    pub extra: Map<String, serde_json::Value>,
}

/// The `repeat` metadata block attached to every emitted instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepeatMeta {
    pub every: Option<i64>,
    pub pattern: Option<String>,
    pub tz: Option<String>,
    pub offset: Option<i64>,
    pub count: u64,
    pub end_date: Option<i64>,
    pub limit: Option<u64>,
}

/// A concrete, individually-executable job instance produced by one
/// scheduler fire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextInstance {
    /// Deterministic id: `repeat:<schedulerId>:<nextFireMs>`.
    pub job_id: String,
    pub name: String,
    /// Opaque JSON payload, copied from the scheduler definition.
    pub data: String,
    /// Milliseconds until this instance should become runnable.
    pub delay: i64,
    /// Creation wall time, epoch ms.
    pub timestamp: i64,
    /// Equal to the fire time that produced this instance; becomes the
    /// next call's `prev_millis`.
    pub prev_millis: i64,
    /// Back-reference to the owning scheduler id.
    pub repeat_job_key: String,
    pub repeat: RepeatMeta,
    /// Opaque, pass-through job options.
    #[serde(flatten)]
    pub opts: Map<String, serde_json::Value>,
}

/// Builds the instance that should be enqueued for one fire of
/// `scheduler_id`.
#[allow(clippy::too_many_arguments)]
pub fn build_instance(
    scheduler_id: &str,
    next_fire_ms: i64,
    now_ms: i64,
    job_name: &str,
    data_json: &str,
    repeat_opts: &RepeatOptions,
    new_offset: Option<i64>,
    iteration_count: u64,
    template: &JobTemplateOptions,
) -> NextInstance {
    let job_id = SchedulerKeys::instance(scheduler_id, next_fire_ms);
    let delay = (next_fire_ms - now_ms).max(0);

    NextInstance {
        job_id,
        name: job_name.to_string(),
        data: data_json.to_string(),
        delay,
        timestamp: now_ms,
        prev_millis: next_fire_ms,
        repeat_job_key: scheduler_id.to_string(),
        repeat: RepeatMeta {
            every: repeat_opts.every,
            pattern: repeat_opts.pattern.clone(),
            tz: repeat_opts.tz.clone(),
            offset: new_offset,
            count: iteration_count,
            end_date: repeat_opts.end_date,
            limit: repeat_opts.limit,
        },
        opts: template.extra.clone(),
    }
}
