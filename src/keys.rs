//! Namespaced key derivation for the scheduler's Redis layout.

/// Builds the three key families the scheduler reads and writes:
/// the next-fire index, per-scheduler definition hashes, and the
/// deterministic instance job ids.
#[derive(Debug, Clone)]
pub struct SchedulerKeys {
    prefix: String,
}

impl SchedulerKeys {
    /// Creates a key builder over `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The sorted set of scheduler ids, scored by next-fire epoch ms.
    pub fn index(&self) -> String {
        format!("{}:repeat", self.prefix)
    }

    /// The hash holding a single scheduler's stored definition.
    pub fn definition(&self, scheduler_id: &str) -> String {
        format!("{}:repeat:{}", self.prefix, scheduler_id)
    }

    /// The deterministic job id for one fire of a scheduler.
    pub fn instance(scheduler_id: &str, next_fire_ms: i64) -> String {
        format!("repeat:{scheduler_id}:{next_fire_ms}")
    }

    /// The namespace prefix this builder was constructed with.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Default for SchedulerKeys {
    fn default() -> Self {
        Self::new("repeatable-jobs")
    }
}
