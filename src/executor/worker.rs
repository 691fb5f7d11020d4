// pool worker thread
use super::item::WorkItem;
use super::pool::PoolShared;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

pub type WorkerId = usize;

// stats for each worker
#[derive(Debug)]
pub struct WorkerState {
    pub items_executed: AtomicU64,
    pub idle_time_ns: AtomicU64,
    pub busy_time_ns: AtomicU64,
}

impl WorkerState {
    pub(crate) fn new() -> Self {
        Self {
            items_executed: AtomicU64::new(0),
            idle_time_ns: AtomicU64::new(0),
            busy_time_ns: AtomicU64::new(0),
        }
    }

    pub fn stats(&self, id: WorkerId) -> WorkerStats {
        WorkerStats {
            id,
            items_executed: self.items_executed.load(Ordering::Relaxed),
            idle_time_ns: self.idle_time_ns.load(Ordering::Relaxed),
            busy_time_ns: self.busy_time_ns.load(Ordering::Relaxed),
        }
    }
}

/// Counters of one worker, see [`WorkerPool::worker_stats`](super::WorkerPool::worker_stats).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    pub id: WorkerId,
    pub items_executed: u64,
    /// Time spent blocked on the queue before an item arrived.
    pub idle_time_ns: u64,
    pub busy_time_ns: u64,
}

impl WorkerStats {
    /// Share of the measured time spent running items (0.0 to 1.0)
    pub fn utilization(&self) -> f64 {
        let total = self.idle_time_ns + self.busy_time_ns;
        if total == 0 {
            return 0.0;
        }
        self.busy_time_ns as f64 / total as f64
    }
}

pub(crate) struct Worker {
    pub id: WorkerId,
    pub state: Arc<WorkerState>,
    shared: Arc<PoolShared>,
}

impl Worker {
    pub fn new(id: WorkerId, shared: Arc<PoolShared>) -> Self {
        Self {
            id,
            state: Arc::new(WorkerState::new()),
            shared,
        }
    }

    // main loop, ends once the queue is closed and drained
    pub fn run(&self) {
        log::debug!("worker {} started", self.id);

        loop {
            let idle_start = Instant::now();
            let Some(item) = self.shared.queue.take() else {
                break;
            };
            let idle_ns = idle_start.elapsed().as_nanos() as u64;
            self.state.idle_time_ns.fetch_add(idle_ns, Ordering::Relaxed);
            self.shared.metrics.record_idle_time(idle_ns);

            self.execute_item(item);
        }

        log::debug!("worker {} exiting", self.id);
    }

    fn execute_item(&self, item: WorkItem) {
        let id = item.id();
        let shared = &self.shared;

        shared.metrics.record_queue_wait(item.queued_for().as_nanos() as u64);
        shared.begin_item();

        let start = Instant::now();
        let result = shared.panics.execute(&id, || item.run());
        let duration_ns = start.elapsed().as_nanos() as u64;

        self.state.busy_time_ns.fetch_add(duration_ns, Ordering::Relaxed);
        self.state.items_executed.fetch_add(1, Ordering::Relaxed);

        match result {
            Ok(()) => {
                log::trace!("worker {} ran {} in {}ns", self.id, id, duration_ns);
                shared.metrics.record_item_execution(duration_ns);
            }
            Err(_) => {
                shared.metrics.record_item_panic();
            }
        }

        shared.finish_item(result.is_err());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_utilization() {
        let stats = WorkerStats {
            id: 0,
            items_executed: 4,
            idle_time_ns: 300,
            busy_time_ns: 100,
        };
        assert_eq!(stats.utilization(), 0.25);

        let fresh = WorkerState::new().stats(3);
        assert_eq!(fresh.id, 3);
        assert_eq!(fresh.utilization(), 0.0);
    }
}
