use super::item::WorkItem;
use super::panic_handler::PanicHandler;
use super::worker::{Worker, WorkerId, WorkerState, WorkerStats};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::queue::BlockingWorkQueue;
use crate::telemetry::Metrics;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// State every worker of one pool shares.
pub(crate) struct PoolShared {
    pub queue: BlockingWorkQueue<WorkItem>,
    pub panics: PanicHandler,
    pub metrics: Arc<Metrics>,
    submitted: AtomicUsize,
    executed: AtomicUsize,
    panicked: AtomicUsize,
    active: AtomicUsize,
    peak_active: AtomicUsize,
    outstanding: Mutex<usize>,
    idle: Condvar,
}

impl PoolShared {
    pub fn begin_item(&self) {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_active.fetch_max(active, Ordering::SeqCst);
    }

    pub fn finish_item(&self, panicked: bool) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.executed.fetch_add(1, Ordering::Relaxed);
        if panicked {
            self.panicked.fetch_add(1, Ordering::Relaxed);
        }

        let mut outstanding = self.outstanding.lock();
        *outstanding -= 1;
        if *outstanding == 0 {
            self.idle.notify_all();
        }
    }
}

/// Counters observed on a [`WorkerPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub submitted: usize,
    pub executed: usize,
    pub panicked: usize,
    pub active: usize,
    /// Largest number of items seen running at the same time.
    pub peak_active: usize,
}

/// Fixed set of worker threads draining one shared FIFO.
pub struct WorkerPool {
    workers: Vec<WorkerHandle>,
    shared: Arc<PoolShared>,
    accepting: AtomicBool,
    num_workers: usize,
}

struct WorkerHandle {
    id: WorkerId,
    state: Arc<WorkerState>,
    thread: Option<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let num_workers = config.worker_threads();
        if num_workers == 0 {
            return Err(Error::config("need at least 1 worker"));
        }

        let shared = Arc::new(PoolShared {
            queue: BlockingWorkQueue::new(),
            panics: PanicHandler::new(config.panic_strategy),
            metrics: Arc::new(Metrics::new()),
            submitted: AtomicUsize::new(0),
            executed: AtomicUsize::new(0),
            panicked: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            peak_active: AtomicUsize::new(0),
            outstanding: Mutex::new(0),
            idle: Condvar::new(),
        });

        let mut pool = Self {
            workers: Vec::with_capacity(num_workers),
            shared,
            accepting: AtomicBool::new(true),
            num_workers,
        };

        for id in 0..num_workers {
            let worker = Worker::new(id, pool.shared.clone());
            let state = worker.state.clone();

            let spawned = config.thread_builder("worker", id).spawn(move || worker.run());
            let thread = match spawned {
                Ok(thread) => thread,
                Err(e) => {
                    // joins whatever already started
                    pool.shutdown();
                    return Err(Error::executor(format!("spawn failed: {}", e)));
                }
            };

            pool.workers.push(WorkerHandle {
                id,
                state,
                thread: Some(thread),
            });
        }

        log::info!("worker pool started with {} workers", num_workers);
        Ok(pool)
    }

    /// Enqueue `item` and return immediately.
    pub fn submit(&self, item: WorkItem) -> Result<()> {
        if !self.accepting.load(Ordering::Acquire) {
            log::warn!("{} rejected: worker pool is shut down", item.id());
            return Err(Error::ShutDown("worker pool"));
        }

        *self.shared.outstanding.lock() += 1;
        self.shared.submitted.fetch_add(1, Ordering::Relaxed);
        self.shared.queue.put(item);
        Ok(())
    }

    pub fn execute<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(WorkItem::new(f))
    }

    /// Block until every item submitted so far has finished running.
    pub fn wait_idle(&self) {
        let mut outstanding = self.shared.outstanding.lock();
        while *outstanding > 0 {
            self.shared.idle.wait(&mut outstanding);
        }
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    pub fn queued(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn stats(&self) -> PoolStats {
        let shared = &self.shared;
        PoolStats {
            submitted: shared.submitted.load(Ordering::Relaxed),
            executed: shared.executed.load(Ordering::Relaxed),
            panicked: shared.panicked.load(Ordering::Relaxed),
            active: shared.active.load(Ordering::SeqCst),
            peak_active: shared.peak_active.load(Ordering::SeqCst),
        }
    }

    /// Busy and idle time of each worker, indexed by worker id.
    pub fn worker_stats(&self) -> Vec<WorkerStats> {
        self.workers.iter().map(|w| w.state.stats(w.id)).collect()
    }

    /// Items executed by each worker, indexed by worker id.
    pub fn executed_per_worker(&self) -> Vec<u64> {
        self.worker_stats().iter().map(|w| w.items_executed).collect()
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.shared.metrics
    }

    /// Stop accepting work, let the workers drain the queue, then join them.
    pub fn shutdown(&mut self) {
        if self.accepting.swap(false, Ordering::AcqRel) {
            log::info!("worker pool shutting down");
        }
        self.shared.queue.close();

        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                if thread.join().is_err() {
                    log::error!("worker {} terminated abnormally", worker.id);
                }
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("num_workers", &self.num_workers)
            .field("stats", &self.stats())
            .finish()
    }
}
