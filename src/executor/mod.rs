//! Fire-and-forget execution on a fixed set of worker threads.
//!
//! This module provides the one-shot [`WorkItem`], the worker loop and the
//! [`WorkerPool`] that owns the workers, plus the panic isolation shared with
//! the cooperative scheduler.

pub mod item;
pub mod panic_handler;
pub mod pool;
pub mod worker;

pub use item::{WorkItem, WorkItemId};
pub use panic_handler::{PanicError, PanicHandler, PanicStrategy};
pub use pool::{PoolStats, WorkerPool};
pub use worker::{WorkerId, WorkerState, WorkerStats};
