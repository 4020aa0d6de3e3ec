//! Atomic Redis operations backing the scheduler core.
//!
//! Each operation that must mutate more than one key atomically is a
//! server-side Lua script loaded via [`redis::Script`], the same
//! mechanism used by Redis-backed job-queue crates elsewhere in the
//! ecosystem (pipelines alone cannot fuse a conditional check with a
//! following write the way these scripts do).

use redis::{AsyncCommands, Script, Value};
use std::collections::HashMap;

use crate::definition::SchedulerDefinition;
use crate::error::{SchedulerError, SchedulerResult};
use crate::instance::NextInstance;
use crate::keys::SchedulerKeys;

type Connection = deadpool_redis::Connection;

/// Holds the compiled Lua scripts for the scheduler's atomic
/// operations. Scripts are loaded once (via `include_str!`) and reused
/// across calls; `redis::Script` handles `EVALSHA`/`EVAL` fallback.
pub struct SchedulerScripts {
    add_job_scheduler: Script,
    update_next_millis: Script,
    remove_job_scheduler: Script,
}

impl Default for SchedulerScripts {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerScripts {
    pub fn new() -> Self {
        Self {
            add_job_scheduler: Script::new(include_str!("lua/add_job_scheduler.lua")),
            update_next_millis: Script::new(include_str!("lua/update_next_millis.lua")),
            remove_job_scheduler: Script::new(include_str!("lua/remove_job_scheduler.lua")),
        }
    }

    /// Writes the full definition, advances the index, and enqueues
    /// `instance`, in one transaction. Used for override-mode upserts.
    pub async fn add_job_scheduler(
        &self,
        conn: &mut Connection,
        keys: &SchedulerKeys,
        scheduler_id: &str,
        next_fire_ms: i64,
        definition: &SchedulerDefinition,
        instance: &NextInstance,
    ) -> SchedulerResult<String> {
        let instance_json = serde_json::to_string(instance)?;
        let instance_hash_key = format!("{}:job:{}", keys.prefix(), instance.job_id);

        let result: Value = self
            .add_job_scheduler
            .key(keys.index())
            .key(keys.definition(scheduler_id))
            .key(format!("{}:delayed", keys.prefix()))
            .key(&instance_hash_key)
            .arg(scheduler_id)
            .arg(next_fire_ms)
            .arg(&definition.name)
            .arg(definition.end_date.map(|v| v.to_string()).unwrap_or_default())
            .arg(definition.tz.clone().unwrap_or_default())
            .arg(definition.pattern.clone().unwrap_or_default())
            .arg(definition.every.map(|v| v.to_string()).unwrap_or_default())
            .arg(&definition.data)
            .arg(&definition.opts)
            .arg(&instance.job_id)
            .arg(&instance_json)
            .invoke_async(&mut *conn)
            .await
            .map_err(|err| classify_script_error(scheduler_id, err))?;

        extract_job_id(scheduler_id, result)
    }

    /// Advances the index score for an existing scheduler and enqueues
    /// `instance`, without touching the definition hash. Used for
    /// non-override upserts. Fails with a "missing scheduler" sentinel
    /// if `scheduler_id` has no index entry.
    pub async fn update_next_millis(
        &self,
        conn: &mut Connection,
        keys: &SchedulerKeys,
        scheduler_id: &str,
        next_fire_ms: i64,
        instance: &NextInstance,
    ) -> SchedulerResult<String> {
        let instance_json = serde_json::to_string(instance)?;
        let instance_hash_key = format!("{}:job:{}", keys.prefix(), instance.job_id);

        let result: Value = self
            .update_next_millis
            .key(keys.index())
            .key(format!("{}:delayed", keys.prefix()))
            .key(&instance_hash_key)
            .arg(scheduler_id)
            .arg(next_fire_ms)
            .arg(&instance.job_id)
            .arg(&instance_json)
            .invoke_async(&mut *conn)
            .await
            .map_err(|err| classify_script_error(scheduler_id, err))?;

        extract_job_id(scheduler_id, result)
    }

    /// Removes both the index entry and the definition hash for
    /// `scheduler_id`. Returns the number of entities removed (0 or 1).
    pub async fn remove_job_scheduler(
        &self,
        conn: &mut Connection,
        keys: &SchedulerKeys,
        scheduler_id: &str,
    ) -> SchedulerResult<i64> {
        let removed: i64 = self
            .remove_job_scheduler
            .key(keys.index())
            .key(keys.definition(scheduler_id))
            .arg(scheduler_id)
            .invoke_async(&mut *conn)
            .await
            .map_err(|err| classify_script_error(scheduler_id, err))?;
        Ok(removed)
    }
}

fn extract_job_id(scheduler_id: &str, value: Value) -> SchedulerResult<String> {
    match value {
        Value::BulkString(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Value::SimpleString(s) => Ok(s),
        other => Err(SchedulerError::Transaction {
            scheduler_id: scheduler_id.to_string(),
            source: format!("unexpected script reply: {other:?}"),
        }),
    }
}

/// Classifies a Redis error raised by one of the Lua scripts.
///
/// The scripts signal their two typed failure modes with a single-word
/// error code (`DUPLICATE_INSTANCE` / `MISSING_SCHEDULER`) followed by a
/// space and the detail, exactly the shape `redis::RedisError::code`/
/// `detail` expect — matching on `err.to_string()` would be wrong here,
/// since redis-rs renders a custom server error as `"{code}: {detail}"`,
/// which does not contain the literal `"duplicate instance:"` substring
/// the Lua message itself uses (the colon lands after the code word,
/// not after "instance").
fn classify_script_error(scheduler_id: &str, err: redis::RedisError) -> SchedulerError {
    if err.code() == Some("DUPLICATE_INSTANCE") {
        let job_id = err.detail().unwrap_or_default().trim().to_string();
        return SchedulerError::DuplicateInstance { job_id };
    }
    if err.code() == Some("MISSING_SCHEDULER") {
        return SchedulerError::NotFound(scheduler_id.to_string());
    }
    SchedulerError::Transaction {
        scheduler_id: scheduler_id.to_string(),
        source: err.to_string(),
    }
}

/// Atomic read of a scheduler's definition hash plus its current index
/// score. No script is needed: an atomic pipeline is sufficient since
/// nothing is mutated.
pub async fn get_job_scheduler(
    conn: &mut Connection,
    keys: &SchedulerKeys,
    scheduler_id: &str,
) -> SchedulerResult<(Option<SchedulerDefinition>, Option<i64>)> {
    let (fields, score): (HashMap<String, String>, Option<i64>) = redis::pipe()
        .atomic()
        .hgetall(keys.definition(scheduler_id))
        .zscore(keys.index(), scheduler_id)
        .query_async(&mut *conn)
        .await?;

    let definition = SchedulerDefinition::from_hash_fields(&fields);
    Ok((definition, score))
}

/// Range query over the index, ascending or descending by next-fire
/// score, returning `(scheduler_id, next_fire_ms)` pairs.
pub async fn list_index(
    conn: &mut Connection,
    keys: &SchedulerKeys,
    start: isize,
    end: isize,
    ascending: bool,
) -> SchedulerResult<Vec<(String, i64)>> {
    let raw: Vec<(String, i64)> = if ascending {
        conn.zrange_withscores(keys.index(), start, end).await?
    } else {
        conn.zrevrange_withscores(keys.index(), start, end).await?
    };
    Ok(raw)
}

/// Cardinality of the index.
pub async fn count_index(conn: &mut Connection, keys: &SchedulerKeys) -> SchedulerResult<u64> {
    let count: u64 = conn.zcard(keys.index()).await?;
    Ok(count)
}
