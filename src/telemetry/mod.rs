//! Telemetry for the pool and the cooperative scheduler.
//!
//! Counters and latency histograms for executed work, plus the starvation
//! signals of the scheduler: how often a ready pending routine was passed
//! over for new work, and how large the pending table has grown.

#[cfg(feature = "telemetry")]
pub mod metrics;

#[cfg(feature = "telemetry")]
pub use metrics::Metrics;

use std::time::Duration;

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub uptime: Duration,
    pub items_executed: u64,
    pub items_panicked: u64,
    pub idle_time_ns: u64,
    pub busy_time_ns: u64,
    pub avg_item_latency_ns: u64,
    pub p99_item_latency_ns: u64,
    pub avg_queue_wait_ns: u64,
    pub routines_started: u64,
    pub routines_completed: u64,
    pub routines_faulted: u64,
    pub routines_cancelled: u64,
    pub steps_executed: u64,
    pub avg_step_latency_ns: u64,
    pub p99_step_latency_ns: u64,
    pub deferred_resumes: u64,
    pub pending_high_water: u64,
    /// Times a scheduler thread left its idle wait without new work, e.g.
    /// when a deferred resume came due. Stays near zero while idle.
    pub idle_wakeups: u64,
}

impl MetricsSnapshot {
    /// Calculate overall utilization (0.0 to 1.0)
    pub fn utilization(&self) -> f64 {
        let total_time = self.idle_time_ns + self.busy_time_ns;
        if total_time == 0 {
            return 0.0;
        }
        self.busy_time_ns as f64 / total_time as f64
    }

    /// Fraction of steps that were taken by new work while a resumable
    /// routine waited. Close to 1.0 means pending routines are starving.
    pub fn starvation_ratio(&self) -> f64 {
        if self.steps_executed == 0 {
            return 0.0;
        }
        self.deferred_resumes as f64 / self.steps_executed as f64
    }

    /// Routines submitted but not yet finished, as far as the counters know.
    pub fn routines_in_flight(&self) -> u64 {
        let finished = self.routines_completed + self.routines_faulted + self.routines_cancelled;
        self.routines_started.saturating_sub(finished)
    }
}

// Stub implementation when telemetry is disabled
#[cfg(not(feature = "telemetry"))]
pub mod metrics {
    use super::MetricsSnapshot;

    #[derive(Debug, Clone, Default)]
    pub struct Metrics;

    impl Metrics {
        pub fn new() -> Self { Self }
        pub fn record_idle_time(&self, _: u64) {}
        pub fn record_queue_wait(&self, _: u64) {}
        pub fn record_item_execution(&self, _: u64) {}
        pub fn record_item_panic(&self) {}
        pub fn record_routine_started(&self) {}
        pub fn record_step(&self, _: u64) {}
        pub fn record_routine_completed(&self) {}
        pub fn record_routine_faulted(&self) {}
        pub fn record_routine_cancelled(&self) {}
        pub fn record_deferred_resume(&self) {}
        pub fn observe_pending(&self, _: usize) {}
        pub fn record_idle_wakeup(&self) {}
        pub fn snapshot(&self) -> MetricsSnapshot { MetricsSnapshot::default() }
        pub fn reset(&self) {}
    }
}

#[cfg(not(feature = "telemetry"))]
pub use metrics::Metrics;
