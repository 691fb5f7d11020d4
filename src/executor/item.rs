//! One-shot units of work for the [`WorkerPool`](super::WorkerPool).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

static WORK_ITEM_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a work item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkItemId(u64);

impl WorkItemId {
    fn next() -> Self {
        WorkItemId(WORK_ITEM_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for WorkItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "work-item-{}", self.0)
    }
}

/// A side-effecting action run exactly once by some worker.
pub struct WorkItem {
    id: WorkItemId,
    func: Box<dyn FnOnce() + Send + 'static>,
    submitted_at: Instant,
}

impl WorkItem {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        WorkItem {
            id: WorkItemId::next(),
            func: Box::new(f),
            submitted_at: Instant::now(),
        }
    }

    pub fn id(&self) -> WorkItemId {
        self.id
    }

    /// Time since the item was created.
    pub fn queued_for(&self) -> Duration {
        self.submitted_at.elapsed()
    }

    pub fn run(self) {
        (self.func)();
    }
}

impl std::fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkItem")
            .field("id", &self.id)
            .field("submitted_at", &self.submitted_at)
            .finish()
    }
}
