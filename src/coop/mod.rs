//! Cooperative routines multiplexed onto a few scheduler threads.
//!
//! A [`Routine`] runs in steps. Each step either yields a [`Checkpoint`] or
//! completes with a value; the [`CooperativeScheduler`] keeps yielded
//! routines in a [`PendingTable`] and resumes them oldest-first, while
//! starting newly submitted routines as they arrive.

pub mod pending;
pub mod routine;
pub mod scheduler;
pub mod task;
pub mod trace;

pub use pending::PendingTable;
pub use routine::{from_fn, Checkpoint, FnRoutine, Routine, RoutineId, Step, StepResult};
pub use scheduler::{CooperativeScheduler, Report, Transition, Turn};
pub use task::{Phase, RoutineTask};
pub use trace::{ExecutionTrace, TraceEvent};
