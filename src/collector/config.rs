use std::time::Duration;

/// Configuration for the collection scheduler and its worker pool.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Hard cap on concurrent workers regardless of credential count.
    pub max_concurrency: usize,

    /// Seconds past each slot boundary before collection fires, letting the
    /// provider's own activity data settle.
    pub settle_delay_seconds: u64,

    /// Maximum time `stop()` waits for an in-flight cycle to finish naturally
    /// before declaring shutdown complete regardless.
    pub shutdown_timeout_seconds: u64,

    /// Tolerance around a slot boundary when checking whether a snapshot
    /// already exists for the slot (seconds).
    pub slot_tolerance_seconds: i64,

    /// Probability of skipping an inactive faction in a given cycle.
    pub inactive_skip_probability: f64,

    /// Probability that a snapshot write triggers a retention prune.
    pub prune_probability: f64,

    /// Snapshot retention window in days.
    pub retention_days: i64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 10,
            settle_delay_seconds: 30,
            shutdown_timeout_seconds: 60,
            slot_tolerance_seconds: 60,
            inactive_skip_probability: 0.75,
            prune_probability: 0.01,
            retention_days: 30,
        }
    }
}

impl CollectorConfig {
    /// Worker count for a cycle: two in-flight requests per credential,
    /// bounded by the hard cap and never zero.
    pub fn worker_count(&self, credential_count: usize) -> usize {
        (credential_count * 2).min(self.max_concurrency).max(1)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_seconds)
    }
}
