//! Metrics collection for the pool and the scheduler.

use super::MetricsSnapshot;
use hdrhistogram::Histogram;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

// one hour in nanoseconds
const MAX_TRACKED_NS: u64 = 3_600_000_000_000;

/// Runtime metrics collector
#[derive(Debug)]
pub struct Metrics {
    // Pool counters
    items_executed: AtomicU64,
    items_panicked: AtomicU64,
    idle_time_ns: AtomicU64,
    busy_time_ns: AtomicU64,
    queue_wait_ns: AtomicU64,

    // Scheduler counters
    routines_started: AtomicU64,
    routines_completed: AtomicU64,
    routines_faulted: AtomicU64,
    routines_cancelled: AtomicU64,
    steps_executed: AtomicU64,
    deferred_resumes: AtomicU64,
    pending_high_water: AtomicU64,
    idle_wakeups: AtomicU64,

    item_latency: RwLock<Histogram<u64>>,
    step_latency: RwLock<Histogram<u64>>,

    start_time: Instant,
}

fn latency_histogram() -> Histogram<u64> {
    Histogram::new_with_max(MAX_TRACKED_NS, 3).expect("static histogram bounds are valid")
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            items_executed: AtomicU64::new(0),
            items_panicked: AtomicU64::new(0),
            idle_time_ns: AtomicU64::new(0),
            busy_time_ns: AtomicU64::new(0),
            queue_wait_ns: AtomicU64::new(0),
            routines_started: AtomicU64::new(0),
            routines_completed: AtomicU64::new(0),
            routines_faulted: AtomicU64::new(0),
            routines_cancelled: AtomicU64::new(0),
            steps_executed: AtomicU64::new(0),
            deferred_resumes: AtomicU64::new(0),
            pending_high_water: AtomicU64::new(0),
            idle_wakeups: AtomicU64::new(0),
            item_latency: RwLock::new(latency_histogram()),
            step_latency: RwLock::new(latency_histogram()),
            start_time: Instant::now(),
        }
    }

    pub fn record_idle_time(&self, duration_ns: u64) {
        self.idle_time_ns.fetch_add(duration_ns, Ordering::Relaxed);
    }

    pub fn record_queue_wait(&self, duration_ns: u64) {
        self.queue_wait_ns.fetch_add(duration_ns, Ordering::Relaxed);
    }

    pub fn record_item_execution(&self, duration_ns: u64) {
        self.items_executed.fetch_add(1, Ordering::Relaxed);
        self.busy_time_ns.fetch_add(duration_ns, Ordering::Relaxed);

        if let Some(mut hist) = self.item_latency.try_write() {
            let _ = hist.record(duration_ns.min(MAX_TRACKED_NS));
        }
    }

    pub fn record_item_panic(&self) {
        self.items_panicked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_routine_started(&self) {
        self.routines_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_step(&self, duration_ns: u64) {
        self.steps_executed.fetch_add(1, Ordering::Relaxed);
        self.busy_time_ns.fetch_add(duration_ns, Ordering::Relaxed);

        if let Some(mut hist) = self.step_latency.try_write() {
            let _ = hist.record(duration_ns.min(MAX_TRACKED_NS));
        }
    }

    pub fn record_routine_completed(&self) {
        self.routines_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_routine_faulted(&self) {
        self.routines_faulted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_routine_cancelled(&self) {
        self.routines_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    /// New work was started although a pending routine was ready to resume.
    pub fn record_deferred_resume(&self) {
        self.deferred_resumes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn observe_pending(&self, len: usize) {
        self.pending_high_water.fetch_max(len as u64, Ordering::Relaxed);
    }

    /// An idle scheduler thread woke up with nothing new to start.
    pub fn record_idle_wakeup(&self) {
        self.idle_wakeups.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let items = self.item_latency.read();
        let steps = self.step_latency.read();
        let items_executed = self.items_executed.load(Ordering::Relaxed);
        let items_panicked = self.items_panicked.load(Ordering::Relaxed);
        let dequeued = items_executed + items_panicked;

        MetricsSnapshot {
            uptime: self.start_time.elapsed(),
            items_executed,
            items_panicked,
            idle_time_ns: self.idle_time_ns.load(Ordering::Relaxed),
            busy_time_ns: self.busy_time_ns.load(Ordering::Relaxed),
            avg_item_latency_ns: if items.len() > 0 { items.mean() as u64 } else { 0 },
            p99_item_latency_ns: items.value_at_quantile(0.99),
            avg_queue_wait_ns: if dequeued > 0 {
                self.queue_wait_ns.load(Ordering::Relaxed) / dequeued
            } else {
                0
            },
            routines_started: self.routines_started.load(Ordering::Relaxed),
            routines_completed: self.routines_completed.load(Ordering::Relaxed),
            routines_faulted: self.routines_faulted.load(Ordering::Relaxed),
            routines_cancelled: self.routines_cancelled.load(Ordering::Relaxed),
            steps_executed: self.steps_executed.load(Ordering::Relaxed),
            avg_step_latency_ns: if steps.len() > 0 { steps.mean() as u64 } else { 0 },
            p99_step_latency_ns: steps.value_at_quantile(0.99),
            deferred_resumes: self.deferred_resumes.load(Ordering::Relaxed),
            pending_high_water: self.pending_high_water.load(Ordering::Relaxed),
            idle_wakeups: self.idle_wakeups.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.items_executed,
            &self.items_panicked,
            &self.idle_time_ns,
            &self.busy_time_ns,
            &self.queue_wait_ns,
            &self.routines_started,
            &self.routines_completed,
            &self.routines_faulted,
            &self.routines_cancelled,
            &self.steps_executed,
            &self.deferred_resumes,
            &self.pending_high_water,
            &self.idle_wakeups,
        ] {
            counter.store(0, Ordering::Relaxed);
        }

        self.item_latency.write().reset();
        self.step_latency.write().reset();
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
