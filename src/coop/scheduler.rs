use super::pending::PendingTable;
use super::routine::{from_fn, Checkpoint, Routine, RoutineId, Step, StepResult};
use super::task::RoutineTask;
use super::trace::{ExecutionTrace, TraceEvent, TraceRecorder};
use crate::config::{Config, ResumePolicy};
use crate::error::{Error, Result};
use crate::executor::PanicHandler;
use crate::queue::{BlockingWorkQueue, Take};
use crate::telemetry::Metrics;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// How a routine left the scheduler, delivered on [`CooperativeScheduler::reports`].
#[derive(Debug)]
pub enum Report<T> {
    Completed { id: RoutineId, value: T, steps: u64 },
    Faulted { id: RoutineId, error: Error },
    Cancelled { id: RoutineId },
}

impl<T> Report<T> {
    pub fn id(&self) -> RoutineId {
        match self {
            Report::Completed { id, .. } | Report::Faulted { id, .. } | Report::Cancelled { id } => *id,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Report::Completed { value, .. } => Some(value),
            _ => None,
        }
    }
}

/// What one step did to its routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Yielded { at: u64 },
    Completed,
    Faulted,
    Cancelled,
}

/// Result of a single scheduling decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    Started { id: RoutineId, transition: Transition },
    Resumed { id: RoutineId, transition: Transition },
    Idle,
}

impl Turn {
    pub fn id(&self) -> Option<RoutineId> {
        match self {
            Turn::Started { id, .. } | Turn::Resumed { id, .. } => Some(*id),
            Turn::Idle => None,
        }
    }

    pub fn transition(&self) -> Option<Transition> {
        match self {
            Turn::Started { transition, .. } | Turn::Resumed { transition, .. } => Some(*transition),
            Turn::Idle => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Turn::Idle)
    }
}

enum Idle {
    Ran,
    Retry,
    Exhausted,
}

// everything guarded by the one table lock
struct State<T> {
    table: PendingTable<T>,
    live: HashSet<RoutineId>,
    cancelled: HashSet<RoutineId>,
}

struct Shared<T> {
    incoming: BlockingWorkQueue<RoutineTask<T>>,
    state: Mutex<State<T>>,
    idle: Condvar,
    policy: ResumePolicy,
    last_was_new: AtomicBool,
    accepting: AtomicBool,
    panics: PanicHandler,
    reports: Sender<Report<T>>,
    metrics: Arc<Metrics>,
    trace: Option<TraceRecorder>,
}

impl<T: Send + 'static> Shared<T> {
    fn try_turn(&self) -> Turn {
        let now = Instant::now();
        let new_first = match self.policy {
            ResumePolicy::PreferNew => true,
            ResumePolicy::Interleave => !self.last_was_new.load(Ordering::Relaxed),
        };

        if new_first {
            if let Some(task) = self.take_new() {
                if self.state.lock().table.has_ready(now) {
                    self.metrics.record_deferred_resume();
                }
                return self.start(task);
            }
            if let Some((task, checkpoint)) = self.take_ready(now) {
                return self.resume(task, checkpoint);
            }
        } else {
            if let Some((task, checkpoint)) = self.take_ready(now) {
                return self.resume(task, checkpoint);
            }
            if let Some(task) = self.take_new() {
                return self.start(task);
            }
        }

        Turn::Idle
    }

    fn take_new(&self) -> Option<RoutineTask<T>> {
        if self.incoming.is_empty() {
            return None;
        }
        self.incoming.try_take()
    }

    fn take_ready(&self, now: Instant) -> Option<(RoutineTask<T>, Checkpoint)> {
        self.state.lock().table.pop_ready(now)
    }

    fn start(&self, task: RoutineTask<T>) -> Turn {
        self.last_was_new.store(true, Ordering::Relaxed);
        let id = task.id();
        Turn::Started {
            id,
            transition: self.run_step(task, None),
        }
    }

    fn resume(&self, task: RoutineTask<T>, checkpoint: Checkpoint) -> Turn {
        self.last_was_new.store(false, Ordering::Relaxed);
        let id = task.id();
        Turn::Resumed {
            id,
            transition: self.run_step(task, Some(checkpoint)),
        }
    }

    fn run_step(&self, mut task: RoutineTask<T>, resume: Option<Checkpoint>) -> Transition {
        let id = task.id();
        if self.state.lock().cancelled.remove(&id) {
            self.finish_cancelled(id);
            return Transition::Cancelled;
        }

        let resumed = resume.is_some();
        if !resumed {
            log::debug!("starting {}", id);
            self.metrics.record_routine_started();
        }
        let step = task.steps() + 1;
        self.record(|timestamp| TraceEvent::StepStarted { id, step, resumed, timestamp });

        let start = Instant::now();
        let outcome = task.step_with(resume, &self.panics);
        self.metrics.record_step(start.elapsed().as_nanos() as u64);

        match outcome {
            Ok(Step::Yield(checkpoint)) => {
                let at = checkpoint.position();
                log::trace!("{} yielded at {}", id, at);
                self.record(|timestamp| TraceEvent::Yielded { id, at, timestamp });

                let mut state = self.state.lock();
                if state.cancelled.remove(&id) {
                    drop(state);
                    self.finish_cancelled(id);
                    return Transition::Cancelled;
                }
                let inserted = state.table.insert(task, checkpoint, Instant::now());
                match inserted {
                    Ok(()) => {
                        self.metrics.observe_pending(state.table.len());
                        Transition::Yielded { at }
                    }
                    Err(error) => {
                        drop(state);
                        self.finish_faulted(id, step, error);
                        Transition::Faulted
                    }
                }
            }
            Ok(Step::Complete(value)) => {
                let steps = task.steps();
                log::debug!("{} completed after {} steps", id, steps);
                self.record(|timestamp| TraceEvent::Completed { id, steps, timestamp });
                self.metrics.record_routine_completed();
                self.finish(id, Report::Completed { id, value, steps });
                Transition::Completed
            }
            Err(error) => {
                self.finish_faulted(id, step, error);
                Transition::Faulted
            }
        }
    }

    fn finish_faulted(&self, id: RoutineId, step: u64, error: Error) {
        log::warn!("{}", error);
        self.record(|timestamp| TraceEvent::Faulted { id, step, timestamp });
        self.metrics.record_routine_faulted();
        self.finish(id, Report::Faulted { id, error });
    }

    fn finish_cancelled(&self, id: RoutineId) {
        log::debug!("{} cancelled", id);
        self.record(|timestamp| TraceEvent::Cancelled { id, timestamp });
        self.metrics.record_routine_cancelled();
        self.finish(id, Report::Cancelled { id });
    }

    // the report goes out before the routine stops counting as live, so
    // wait_idle returning means every report is already in the channel
    fn finish(&self, id: RoutineId, report: Report<T>) {
        let _ = self.reports.send(report);

        let mut state = self.state.lock();
        state.live.remove(&id);
        state.cancelled.remove(&id);
        if state.live.is_empty() {
            self.idle.notify_all();
        }
    }

    fn record(&self, make: impl FnOnce(u64) -> TraceEvent) {
        if let Some(trace) = &self.trace {
            trace.record(make);
        }
    }

    /// Nothing was runnable: wait for new work or the next deferred wake
    /// time without spinning.
    fn idle(&self, block_when_empty: bool) -> Idle {
        let outcome = self.wait_for_work(block_when_empty);
        if let Idle::Retry = outcome {
            self.metrics.record_idle_wakeup();
        }
        outcome
    }

    fn wait_for_work(&self, block_when_empty: bool) -> Idle {
        let next_wake = {
            let mut state = self.state.lock();
            if state.table.has_ready(Instant::now()) {
                return Idle::Retry;
            }
            state.table.next_wake()
        };

        match next_wake {
            Some(wake_at) => {
                let timeout = wake_at.saturating_duration_since(Instant::now());
                match self.incoming.take_timeout(timeout) {
                    Take::Item(task) => {
                        self.start(task);
                        Idle::Ran
                    }
                    Take::TimedOut => Idle::Retry,
                    Take::Closed => {
                        // only sleepers left, unless they were all cancelled
                        let mut state = self.state.lock();
                        if !state.live.is_empty() {
                            self.idle.wait_until(&mut state, wake_at);
                        }
                        Idle::Retry
                    }
                }
            }
            None if !block_when_empty => {
                if self.incoming.is_empty() {
                    Idle::Exhausted
                } else {
                    Idle::Retry
                }
            }
            None => match self.incoming.take() {
                Some(task) => {
                    self.start(task);
                    Idle::Ran
                }
                None => Idle::Exhausted,
            },
        }
    }

    fn run_loop(&self, thread_id: usize) {
        log::debug!("scheduler thread {} started", thread_id);
        loop {
            if !self.try_turn().is_idle() {
                continue;
            }
            if let Idle::Exhausted = self.idle(true) {
                break;
            }
        }
        log::debug!("scheduler thread {} exiting", thread_id);
    }
}

/// Runs cooperative routines step by step.
///
/// On every turn the scheduler either starts the next submitted routine or
/// resumes the routine that has been pending the longest. With
/// [`ResumePolicy::PreferNew`] new routines always win that choice;
/// [`ResumePolicy::Interleave`] alternates. Pending routines are resumed in
/// the order they yielded, so routines that keep yielding are served
/// round-robin.
///
/// A scheduler built with [`new`](Self::new) hosts the loop on its own
/// threads; one built with [`manual`](Self::manual) only advances when the
/// caller invokes [`turn`](Self::turn) or [`drain`](Self::drain).
pub struct CooperativeScheduler<T: Send + 'static> {
    shared: Arc<Shared<T>>,
    threads: Vec<JoinHandle<()>>,
    reports: Receiver<Report<T>>,
}

impl<T: Send + 'static> CooperativeScheduler<T> {
    /// Start `config.scheduler_threads` threads running the scheduling loop.
    pub fn new(config: &Config) -> Result<Self> {
        let mut scheduler = Self::manual(config)?;

        for id in 0..config.scheduler_threads {
            let shared = scheduler.shared.clone();
            let spawned = config
                .thread_builder("sched", id)
                .spawn(move || shared.run_loop(id));
            match spawned {
                Ok(thread) => scheduler.threads.push(thread),
                Err(e) => {
                    scheduler.shutdown();
                    return Err(Error::executor(format!("spawn failed: {}", e)));
                }
            }
        }

        log::info!(
            "cooperative scheduler started on {} thread(s), policy {:?}",
            config.scheduler_threads,
            config.resume_policy
        );
        Ok(scheduler)
    }

    /// A scheduler with no threads of its own.
    pub fn manual(config: &Config) -> Result<Self> {
        config.validate()?;
        let (tx, rx) = unbounded();

        let shared = Arc::new(Shared {
            incoming: BlockingWorkQueue::new(),
            state: Mutex::new(State {
                table: PendingTable::new(),
                live: HashSet::new(),
                cancelled: HashSet::new(),
            }),
            idle: Condvar::new(),
            policy: config.resume_policy,
            last_was_new: AtomicBool::new(false),
            accepting: AtomicBool::new(true),
            panics: PanicHandler::new(config.panic_strategy),
            reports: tx,
            metrics: Arc::new(Metrics::new()),
            trace: config.record_trace.then(TraceRecorder::new),
        });

        Ok(Self {
            shared,
            threads: Vec::new(),
            reports: rx,
        })
    }

    pub fn submit_routine<R>(&self, routine: R) -> Result<RoutineId>
    where
        R: Routine<Output = T>,
    {
        if !self.shared.accepting.load(Ordering::Acquire) {
            log::warn!("routine rejected: scheduler is shut down");
            return Err(Error::ShutDown("cooperative scheduler"));
        }

        let task = RoutineTask::new(routine);
        let id = task.id();
        self.shared.state.lock().live.insert(id);
        self.shared.record(|timestamp| TraceEvent::Submitted { id, timestamp });
        self.shared.incoming.put(task);
        Ok(id)
    }

    pub fn submit_fn<F>(&self, f: F) -> Result<RoutineId>
    where
        F: FnMut(Option<Checkpoint>) -> StepResult<T> + Send + 'static,
    {
        self.submit_routine(from_fn(f))
    }

    /// Make one scheduling decision and run at most one step.
    pub fn turn(&self) -> Turn {
        self.shared.try_turn()
    }

    /// Run turns until no submitted or pending routine is left, waiting out
    /// deferred resumes. Returns the number of steps taken.
    pub fn drain(&self) -> usize {
        let mut turns = 0;
        loop {
            if !self.shared.try_turn().is_idle() {
                turns += 1;
                continue;
            }
            match self.shared.idle(false) {
                Idle::Ran => turns += 1,
                Idle::Retry => {}
                Idle::Exhausted => return turns,
            }
        }
    }

    /// Cancel a routine that has not finished yet.
    ///
    /// A pending routine is removed right away. One that is queued or in the
    /// middle of a step is dropped before it would next run. Returns `false`
    /// if the routine already finished or was never submitted here.
    pub fn cancel(&self, id: RoutineId) -> bool {
        let mut state = self.shared.state.lock();
        if !state.live.contains(&id) {
            return false;
        }

        let removed = state.table.remove(id);
        match removed {
            Some(task) => {
                drop(state);
                drop(task);
                self.shared.finish_cancelled(id);
            }
            None => {
                state.cancelled.insert(id);
            }
        }
        true
    }

    /// Block until every submitted routine has completed, faulted or been
    /// cancelled. On a manual scheduler someone else must be driving turns.
    pub fn wait_idle(&self) {
        let mut state = self.shared.state.lock();
        while !state.live.is_empty() {
            self.shared.idle.wait(&mut state);
        }
    }

    /// Like [`wait_idle`](Self::wait_idle); `false` if `timeout` passed first.
    pub fn wait_idle_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        while !state.live.is_empty() {
            if self.shared.idle.wait_until(&mut state, deadline).timed_out() {
                return state.live.is_empty();
            }
        }
        true
    }

    /// Every finished routine leaves one report here.
    ///
    /// The channel is unbounded and nothing drops unread reports, so they
    /// pile up (values included) until they are received. A
    /// long-running scheduler should drain it, for example with
    /// `reports().try_iter()` after each batch.
    pub fn reports(&self) -> &Receiver<Report<T>> {
        &self.reports
    }

    pub fn pending_len(&self) -> usize {
        self.shared.state.lock().table.len()
    }

    pub fn pending_ids(&self) -> Vec<RoutineId> {
        self.shared.state.lock().table.ids()
    }

    pub fn is_pending(&self, id: RoutineId) -> bool {
        self.shared.state.lock().table.contains(id)
    }

    pub fn queued_len(&self) -> usize {
        self.shared.incoming.len()
    }

    /// Routines submitted and not yet finished.
    pub fn live_len(&self) -> usize {
        self.shared.state.lock().live.len()
    }

    pub fn num_threads(&self) -> usize {
        self.threads.len()
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.shared.metrics
    }

    pub fn trace(&self) -> Option<ExecutionTrace> {
        self.shared.trace.as_ref().map(|t| t.snapshot())
    }

    /// Stop accepting routines, let the loop threads finish everything
    /// already submitted, then join them.
    pub fn shutdown(&mut self) {
        if self.shared.accepting.swap(false, Ordering::AcqRel) {
            log::info!("cooperative scheduler shutting down");
        }
        self.shared.incoming.close();

        for thread in self.threads.drain(..) {
            if thread.join().is_err() {
                log::error!("scheduler thread terminated abnormally");
            }
        }
    }
}

impl<T: Send + 'static> Drop for CooperativeScheduler<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<T: Send + 'static> std::fmt::Debug for CooperativeScheduler<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CooperativeScheduler")
            .field("threads", &self.threads.len())
            .field("queued", &self.queued_len())
            .field("pending", &self.pending_len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::PanicStrategy;

    fn manual(policy: ResumePolicy) -> CooperativeScheduler<u64> {
        let config = Config::builder()
            .resume_policy(policy)
            .panic_strategy(PanicStrategy::Isolate)
            .record_trace(true)
            .build()
            .unwrap();
        CooperativeScheduler::manual(&config).unwrap()
    }

    // yields `yields` times, then completes with `value`
    fn yielding(
        yields: u64,
        value: u64,
    ) -> impl FnMut(Option<Checkpoint>) -> StepResult<u64> + Send + 'static {
        move |resume| {
            let at = resume.map_or(0, |c| c.position());
            if at < yields {
                Ok(Step::yield_at(at + 1))
            } else {
                Ok(Step::Complete(value))
            }
        }
    }

    #[test]
    fn test_yield_yield_complete() {
        let scheduler = manual(ResumePolicy::PreferNew);
        let id = scheduler.submit_fn(yielding(2, 42)).unwrap();

        assert_eq!(
            scheduler.turn(),
            Turn::Started { id, transition: Transition::Yielded { at: 1 } }
        );
        assert!(scheduler.is_pending(id));
        assert_eq!(
            scheduler.turn(),
            Turn::Resumed { id, transition: Transition::Yielded { at: 2 } }
        );
        assert_eq!(scheduler.turn(), Turn::Resumed { id, transition: Transition::Completed });

        assert!(!scheduler.is_pending(id));
        assert_eq!(scheduler.turn(), Turn::Idle);
        match scheduler.reports().try_recv().unwrap() {
            Report::Completed { id: done, value, steps } => {
                assert_eq!(done, id);
                assert_eq!(value, 42);
                assert_eq!(steps, 3);
            }
            other => panic!("unexpected report {:?}", other),
        }
    }

    #[test]
    fn test_resume_in_yield_order() {
        let scheduler = manual(ResumePolicy::PreferNew);
        let x = scheduler.submit_fn(yielding(1, 0)).unwrap();
        let y = scheduler.submit_fn(yielding(1, 0)).unwrap();

        assert_eq!(scheduler.turn().id(), Some(x));
        assert_eq!(scheduler.turn().id(), Some(y));
        assert_eq!(
            scheduler.turn(),
            Turn::Resumed { id: x, transition: Transition::Completed }
        );
        assert_eq!(
            scheduler.turn(),
            Turn::Resumed { id: y, transition: Transition::Completed }
        );
    }

    #[test]
    fn test_new_work_preferred_over_pending() {
        let scheduler = manual(ResumePolicy::PreferNew);
        let a = scheduler.submit_fn(yielding(3, 0)).unwrap();
        scheduler.turn();

        let b = scheduler.submit_fn(yielding(0, 0)).unwrap();
        assert_eq!(scheduler.turn(), Turn::Started { id: b, transition: Transition::Completed });
        assert_eq!(scheduler.turn().id(), Some(a));
        let expected = if cfg!(feature = "telemetry") { 1 } else { 0 };
        assert_eq!(scheduler.metrics().snapshot().deferred_resumes, expected);
    }

    #[test]
    fn test_interleave_alternates() {
        let scheduler = manual(ResumePolicy::Interleave);
        let a = scheduler.submit_fn(yielding(5, 0)).unwrap();
        assert_eq!(scheduler.turn().id(), Some(a));

        let b = scheduler.submit_fn(yielding(5, 0)).unwrap();
        let c = scheduler.submit_fn(yielding(5, 0)).unwrap();

        // a is pending and last turn started new work, so a goes first
        let order: Vec<_> = (0..4).map(|_| scheduler.turn().id().unwrap()).collect();
        assert_eq!(order, vec![a, b, a, c]);
    }

    #[test]
    fn test_fault_is_isolated() {
        let scheduler = manual(ResumePolicy::PreferNew);
        let bad = scheduler
            .submit_fn(|resume: Option<Checkpoint>| match resume {
                None => Ok(Step::yield_at(1)),
                Some(_) => Err("second step failed".into()),
            })
            .unwrap();

        assert_eq!(scheduler.turn().transition(), Some(Transition::Yielded { at: 1 }));
        assert_eq!(scheduler.turn(), Turn::Resumed { id: bad, transition: Transition::Faulted });
        assert_eq!(scheduler.pending_len(), 0);

        match scheduler.reports().try_recv().unwrap() {
            Report::Faulted { id, error } => {
                assert_eq!(id, bad);
                assert_eq!(error.routine(), Some(bad));
            }
            other => panic!("unexpected report {:?}", other),
        }

        let good = scheduler.submit_fn(yielding(1, 7)).unwrap();
        assert_eq!(scheduler.drain(), 2);
        let report = scheduler.reports().try_recv().unwrap();
        assert_eq!(report.id(), good);
        assert_eq!(report.into_value(), Some(7));
    }

    #[test]
    fn test_panicking_step_is_a_fault() {
        let scheduler = manual(ResumePolicy::PreferNew);
        let id = scheduler
            .submit_fn(|_: Option<Checkpoint>| -> StepResult<u64> { panic!("kaboom") })
            .unwrap();

        assert_eq!(scheduler.turn(), Turn::Started { id, transition: Transition::Faulted });
        assert!(matches!(
            scheduler.reports().try_recv().unwrap(),
            Report::Faulted { .. }
        ));
        assert_eq!(scheduler.live_len(), 0);
    }

    #[test]
    fn test_cancel_pending_and_queued() {
        let scheduler = manual(ResumePolicy::PreferNew);
        let pending = scheduler.submit_fn(yielding(3, 0)).unwrap();
        scheduler.turn();
        let queued = scheduler.submit_fn(yielding(3, 0)).unwrap();

        assert!(scheduler.cancel(pending));
        assert!(!scheduler.is_pending(pending));
        assert!(scheduler.cancel(queued));

        assert_eq!(
            scheduler.turn(),
            Turn::Started { id: queued, transition: Transition::Cancelled }
        );
        assert_eq!(scheduler.turn(), Turn::Idle);
        assert_eq!(scheduler.live_len(), 0);
        assert!(!scheduler.cancel(pending));

        let cancelled: Vec<_> = scheduler.reports().try_iter().map(|r| r.id()).collect();
        assert_eq!(cancelled, vec![pending, queued]);
    }

    #[test]
    fn test_deferred_resume_waits() {
        let scheduler = manual(ResumePolicy::PreferNew);
        let delay = Duration::from_millis(30);
        let id = scheduler
            .submit_fn(move |resume: Option<Checkpoint>| match resume {
                None => Ok(Step::yield_after(1, delay)),
                Some(_) => Ok(Step::Complete(1)),
            })
            .unwrap();

        let start = Instant::now();
        assert_eq!(scheduler.turn().id(), Some(id));
        assert_eq!(scheduler.turn(), Turn::Idle);
        assert_eq!(scheduler.pending_len(), 1);

        assert_eq!(scheduler.drain(), 1);
        assert!(start.elapsed() >= delay);
        assert_eq!(scheduler.reports().try_recv().unwrap().into_value(), Some(1));
    }

    #[test]
    fn test_trace_records_step_order() {
        let scheduler = manual(ResumePolicy::PreferNew);
        let a = scheduler.submit_fn(yielding(1, 0)).unwrap();
        let b = scheduler.submit_fn(yielding(1, 0)).unwrap();
        scheduler.drain();

        let trace = scheduler.trace().unwrap();
        assert_eq!(trace.step_order(), vec![a, b, a, b]);
        assert!(matches!(trace.events()[0], TraceEvent::Submitted { id, .. } if id == a));
    }

    #[test]
    fn test_submit_after_shutdown_is_rejected() {
        let mut scheduler = manual(ResumePolicy::PreferNew);
        scheduler.shutdown();
        assert!(matches!(
            scheduler.submit_fn(yielding(0, 0)),
            Err(Error::ShutDown(_))
        ));
    }

    #[test]
    fn test_unread_reports_are_retained() {
        let scheduler = manual(ResumePolicy::PreferNew);
        for i in 0..5 {
            scheduler.submit_fn(yielding(0, i)).unwrap();
        }
        scheduler.drain();

        assert_eq!(scheduler.reports().len(), 5);
        assert_eq!(scheduler.reports().try_iter().count(), 5);
        assert!(scheduler.reports().is_empty());
    }

    #[test]
    fn test_shutdown_after_cancelling_sleeper_is_prompt() {
        let config = Config::builder().build().unwrap();
        let mut scheduler: CooperativeScheduler<u64> = CooperativeScheduler::new(&config).unwrap();
        let id = scheduler
            .submit_fn(|_: Option<Checkpoint>| Ok(Step::yield_after(1, Duration::from_secs(10))))
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while !scheduler.is_pending(id) {
            assert!(Instant::now() < deadline, "routine never yielded");
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(scheduler.cancel(id));

        let start = Instant::now();
        scheduler.shutdown();
        assert!(start.elapsed() < Duration::from_secs(2));
        assert!(matches!(
            scheduler.reports().try_recv().unwrap(),
            Report::Cancelled { .. }
        ));
    }

    #[test]
    fn test_threaded_scheduler_completes_everything() {
        let config = Config::builder().scheduler_threads(2).build().unwrap();
        let mut scheduler = CooperativeScheduler::new(&config).unwrap();

        for i in 0..20 {
            scheduler.submit_fn(yielding(i % 4, i)).unwrap();
        }
        assert!(scheduler.wait_idle_timeout(Duration::from_secs(10)));

        let mut values: Vec<u64> = scheduler
            .reports()
            .try_iter()
            .filter_map(Report::into_value)
            .collect();
        values.sort_unstable();
        assert_eq!(values, (0..20).collect::<Vec<_>>());

        scheduler.shutdown();
        assert_eq!(scheduler.num_threads(), 0);
    }
}
