//! Integration tests against a live Redis server.
//!
//! These exercise the scheduler through actual Lua script execution
//! rather than the pure logic unit tests colocated with each module.
//! They require `REDIS_URL` and are skipped by default; run with
//! `cargo test --features integration -- --ignored`.

use std::sync::Arc;

use deadpool_redis::{Config, Runtime};
use serde_json::json;

use repeatable_jobs::{
    create_pool, FixedClock, JobScheduler, JobTemplateOptions, RedisConfig, RepeatOptions, SchedulerConfig, SchedulerError,
    UpsertRequest,
};

async fn setup() -> (JobScheduler, String) {
    let redis_url = std::env::var("REDIS_URL").expect("REDIS_URL must be set for integration tests");
    let prefix = format!("repeatable-jobs-test-{}", std::process::id());

    let pool = Config::from_url(&redis_url)
        .builder()
        .expect("invalid redis config")
        .runtime(Runtime::Tokio1)
        .build()
        .expect("failed to build pool");

    let config = SchedulerConfig {
        key_prefix: prefix.clone(),
        default_limit: None,
    };
    let clock = Arc::new(FixedClock::new(1000));
    let scheduler = JobScheduler::with_clock(pool, &config, clock);
    (scheduler, prefix)
}

async fn flush(scheduler: &JobScheduler) {
    // Best-effort cleanup; each test uses a process-unique key prefix so
    // leftovers from a crashed run don't bleed into the next one.
    let _ = scheduler.remove("s1").await;
}

#[tokio::test]
#[cfg_attr(not(feature = "integration"), ignore)]
async fn create_pool_pings_the_server() {
    let redis_url = std::env::var("REDIS_URL").expect("REDIS_URL must be set for integration tests");
    let config = RedisConfig {
        url: redis_url,
        ..Default::default()
    };
    create_pool(&config).await.expect("pool creation should succeed against a live server");
}

#[tokio::test]
#[cfg_attr(not(feature = "integration"), ignore)]
async fn override_upsert_then_get_round_trips() {
    let (scheduler, _prefix) = setup().await;
    flush(&scheduler).await;

    let req = UpsertRequest::new(
        "s1",
        RepeatOptions {
            every: Some(1000),
            ..Default::default()
        },
        "send-email",
        json!({"to": "a@b.com"}),
    );

    let handle = scheduler.upsert(req).await.expect("upsert failed").expect("expected a job");
    assert_eq!(handle.job_id, "repeat:s1:1000");
    assert_eq!(handle.next_fire_ms, 1000);

    let descriptor = scheduler.get("s1").await.expect("get failed").expect("scheduler not found");
    assert_eq!(descriptor.name, "send-email");
    assert_eq!(descriptor.every, Some(1000));
    assert_eq!(descriptor.next, Some(1000));

    flush(&scheduler).await;
}

#[tokio::test]
#[cfg_attr(not(feature = "integration"), ignore)]
async fn non_override_upsert_advances_score_only() {
    let (scheduler, _prefix) = setup().await;
    flush(&scheduler).await;

    let first = UpsertRequest::new(
        "s1",
        RepeatOptions {
            every: Some(1000),
            ..Default::default()
        },
        "send-email",
        json!({"to": "a@b.com"}),
    );
    scheduler.upsert(first).await.expect("first upsert failed").expect("expected a job");

    let mut second = UpsertRequest::new(
        "s1",
        RepeatOptions {
            every: Some(1000),
            offset: Some(1000),
            ..Default::default()
        },
        "send-email",
        json!({"to": "a@b.com"}),
    );
    second.override_definition = false;
    second.template = JobTemplateOptions {
        prev_millis: Some(1000),
        ..Default::default()
    };

    let handle = scheduler.upsert(second).await.expect("second upsert failed").expect("expected a job");
    assert_eq!(handle.job_id, "repeat:s1:3000");

    flush(&scheduler).await;
}

#[tokio::test]
#[cfg_attr(not(feature = "integration"), ignore)]
async fn remove_drops_index_entry() {
    let (scheduler, _prefix) = setup().await;
    flush(&scheduler).await;

    let req = UpsertRequest::new(
        "s1",
        RepeatOptions {
            every: Some(1000),
            ..Default::default()
        },
        "send-email",
        json!({}),
    );
    scheduler.upsert(req).await.expect("upsert failed");

    let before = scheduler.count().await.expect("count failed");
    let removed = scheduler.remove("s1").await.expect("remove failed");
    assert_eq!(removed, 1);

    let after = scheduler.count().await.expect("count failed");
    assert_eq!(after, before - 1);

    let descriptor = scheduler.get("s1").await.expect("get failed");
    assert!(descriptor.is_none());
}

#[tokio::test]
#[cfg_attr(not(feature = "integration"), ignore)]
async fn override_redefinition_drops_stale_scheduling_fields() {
    let (scheduler, _prefix) = setup().await;
    flush(&scheduler).await;

    let pattern_req = UpsertRequest::new(
        "s1",
        RepeatOptions {
            pattern: Some("0 0 * * * *".into()),
            tz: Some("UTC".into()),
            ..Default::default()
        },
        "send-email",
        json!({}),
    );
    scheduler.upsert(pattern_req).await.expect("upsert failed");

    let interval_req = UpsertRequest::new(
        "s1",
        RepeatOptions {
            every: Some(1000),
            ..Default::default()
        },
        "send-email",
        json!({}),
    );
    scheduler.upsert(interval_req).await.expect("upsert failed");

    let descriptor = scheduler.get("s1").await.expect("get failed").expect("scheduler not found");
    assert_eq!(descriptor.every, Some(1000));
    assert!(descriptor.pattern.is_none(), "stale pattern should be cleared on override");
    assert!(descriptor.tz.is_none(), "stale tz should be cleared on override");

    flush(&scheduler).await;
}

#[tokio::test]
#[cfg_attr(not(feature = "integration"), ignore)]
async fn racing_upsert_surfaces_duplicate_instance() {
    let (scheduler, _prefix) = setup().await;
    flush(&scheduler).await;

    let req = || {
        UpsertRequest::new(
            "s1",
            RepeatOptions {
                every: Some(1000),
                ..Default::default()
            },
            "send-email",
            json!({}),
        )
    };

    // Both calls see the same FixedClock value, so they compute the same
    // deterministic job id; only one can win the HEXISTS guard in the
    // fused Lua script.
    scheduler.upsert(req()).await.expect("first upsert failed").expect("expected a job");
    let second = scheduler.upsert(req()).await;

    assert!(
        matches!(second, Err(SchedulerError::DuplicateInstance { ref job_id }) if job_id == "repeat:s1:1000"),
        "expected DuplicateInstance, got {second:?}"
    );

    flush(&scheduler).await;
}

#[tokio::test]
#[cfg_attr(not(feature = "integration"), ignore)]
async fn non_override_upsert_on_unknown_id_is_not_found() {
    let (scheduler, _prefix) = setup().await;
    flush(&scheduler).await;

    let mut req = UpsertRequest::new(
        "s1",
        RepeatOptions {
            every: Some(1000),
            ..Default::default()
        },
        "send-email",
        json!({}),
    );
    req.override_definition = false;

    let result = scheduler.upsert(req).await;
    assert!(
        matches!(result, Err(SchedulerError::NotFound(ref id)) if id == "s1"),
        "expected NotFound, got {result:?}"
    );
}
