//! The resumable routine abstraction.

use crate::error::BoxError;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

static ROUTINE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Handle identifying one submitted routine for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoutineId(u64);

impl RoutineId {
    pub(crate) fn next() -> Self {
        RoutineId(ROUTINE_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn from_raw(raw: u64) -> Self {
        RoutineId(raw)
    }
}

impl std::fmt::Display for RoutineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "routine-{}", self.0)
    }
}

/// Where a routine left off, handed back to it on the next invocation.
///
/// A routine builds one with [`Checkpoint::at`]; the scheduler stamps it with
/// the owning routine and the yield sequence, so a checkpoint can only be
/// used to resume the routine that produced it, and only once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    at: u64,
    delay: Option<Duration>,
    pub(crate) owner: Option<RoutineId>,
    pub(crate) seq: u64,
}

impl Checkpoint {
    pub fn at(position: u64) -> Self {
        Self {
            at: position,
            delay: None,
            owner: None,
            seq: 0,
        }
    }

    /// Ask not to be resumed before `delay` has elapsed.
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn position(&self) -> u64 {
        self.at
    }

    pub fn delay(&self) -> Option<Duration> {
        self.delay
    }

    pub fn owner(&self) -> Option<RoutineId> {
        self.owner
    }
}

/// Result of advancing a routine by one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<T> {
    Yield(Checkpoint),
    Complete(T),
}

impl<T> Step<T> {
    pub fn yield_at(position: u64) -> Self {
        Step::Yield(Checkpoint::at(position))
    }

    pub fn yield_after(position: u64, delay: Duration) -> Self {
        Step::Yield(Checkpoint::at(position).after(delay))
    }
}

pub type StepResult<T> = std::result::Result<Step<T>, BoxError>;

/// A unit of work that runs in steps and keeps its own cursor between them.
///
/// `step` is called with `None` the first time and afterwards with the
/// checkpoint from the previous `Yield`. It must return promptly: pausing is
/// done by yielding (optionally with [`Checkpoint::after`]), never by
/// blocking the calling thread.
pub trait Routine: Send + 'static {
    type Output: Send + 'static;

    fn step(&mut self, resume: Option<Checkpoint>) -> StepResult<Self::Output>;
}

/// Routine backed by a closure.
pub struct FnRoutine<F> {
    f: F,
}

impl<F, T> Routine for FnRoutine<F>
where
    F: FnMut(Option<Checkpoint>) -> StepResult<T> + Send + 'static,
    T: Send + 'static,
{
    type Output = T;

    fn step(&mut self, resume: Option<Checkpoint>) -> StepResult<T> {
        (self.f)(resume)
    }
}

impl<F> std::fmt::Debug for FnRoutine<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnRoutine").finish_non_exhaustive()
    }
}

pub fn from_fn<F, T>(f: F) -> FnRoutine<F>
where
    F: FnMut(Option<Checkpoint>) -> StepResult<T> + Send + 'static,
    T: Send + 'static,
{
    FnRoutine { f }
}
