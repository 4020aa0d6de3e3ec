//! Prometheus metrics for scheduler monitoring.

use metrics::{counter, describe_counter, describe_gauge, gauge};

/// Metric names for the scheduler.
pub mod names {
    /// Total upserts committed (override or advance-only).
    pub const SCHEDULER_UPSERTS_TOTAL: &str = "scheduler_upserts_total";
    /// Total instances enqueued into the delayed queue.
    pub const SCHEDULER_INSTANCES_ENQUEUED_TOTAL: &str = "scheduler_instances_enqueued_total";
    /// Total upserts that produced no instance (dead strategy, horizon reached).
    pub const SCHEDULER_DEAD_SCHEDULES_TOTAL: &str = "scheduler_dead_schedules_total";
    /// Current number of live scheduler definitions.
    pub const SCHEDULER_DEFINITIONS: &str = "scheduler_definitions";
}

/// Registers all metric descriptions with the global recorder.
pub fn register_metrics() {
    describe_counter!(
        names::SCHEDULER_UPSERTS_TOTAL,
        "Total number of scheduler upserts committed"
    );
    describe_counter!(
        names::SCHEDULER_INSTANCES_ENQUEUED_TOTAL,
        "Total number of job instances enqueued by the scheduler"
    );
    describe_counter!(
        names::SCHEDULER_DEAD_SCHEDULES_TOTAL,
        "Total number of upserts that produced no next fire time"
    );
    describe_gauge!(
        names::SCHEDULER_DEFINITIONS,
        "Current number of live scheduler definitions"
    );
}

/// Scheduler metrics recorder.
#[derive(Clone)]
pub struct SchedulerMetrics;

impl SchedulerMetrics {
    /// Records a committed upsert for `job_name`.
    pub fn upsert_committed(job_name: &str) {
        counter!(
            names::SCHEDULER_UPSERTS_TOTAL,
            "job_name" => job_name.to_string()
        )
        .increment(1);
    }

    /// Records an instance enqueued for `job_name`.
    pub fn instance_enqueued(job_name: &str) {
        counter!(
            names::SCHEDULER_INSTANCES_ENQUEUED_TOTAL,
            "job_name" => job_name.to_string()
        )
        .increment(1);
    }

    /// Records an upsert that produced no next fire time.
    pub fn dead_schedule(job_name: &str) {
        counter!(
            names::SCHEDULER_DEAD_SCHEDULES_TOTAL,
            "job_name" => job_name.to_string()
        )
        .increment(1);
    }

    /// Updates the live-definition count gauge.
    pub fn update_definition_count(count: u64) {
        gauge!(names::SCHEDULER_DEFINITIONS).set(count as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registering_and_recording_does_not_panic() {
        register_metrics();
        SchedulerMetrics::upsert_committed("send-email");
        SchedulerMetrics::instance_enqueued("send-email");
        SchedulerMetrics::dead_schedule("send-email");
        SchedulerMetrics::update_definition_count(3);
    }
}
