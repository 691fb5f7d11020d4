//! tandem - cooperative routines and a fixed worker pool on OS threads
//!
//! Two execution engines sharing one blocking FIFO abstraction:
//!
//! - [`WorkerPool`]: a fixed number of worker threads running one-shot
//!   [`WorkItem`]s to completion, fire-and-forget.
//! - [`CooperativeScheduler`]: routines that advance in steps, yielding a
//!   [`Checkpoint`] between them, multiplexed onto one or a few threads.
//!   Yielded routines are resumed oldest-first; a routine that wants to pause
//!   yields with a delay instead of blocking the thread.
//!
//! # Quick Start
//!
//! ```no_run
//! use tandem_rs::prelude::*;
//!
//! let config = Config::builder().scheduler_threads(1).build().unwrap();
//! let scheduler = CooperativeScheduler::new(&config).unwrap();
//!
//! scheduler
//!     .submit_fn(|resume: Option<Checkpoint>| {
//!         let at = resume.map_or(0, |c| c.position()) + 1;
//!         if at < 4 {
//!             Ok(Step::yield_at(at))
//!         } else {
//!             Ok(Step::Complete(at))
//!         }
//!     })
//!     .unwrap();
//!
//! scheduler.wait_idle();
//! let report = scheduler.reports().recv().unwrap();
//! assert_eq!(report.into_value(), Some(4));
//! ```
//!
//! # Features
//!
//! - **Blocking FIFO**: [`BlockingWorkQueue`], closable, with timed takes
//! - **Panic isolation**: a panicking item or step never takes its thread down
//! - **Fair resumption**: round-robin among yielded routines, with a
//!   configurable new-versus-pending tie-break ([`ResumePolicy`])
//! - **Telemetry**: counters, latency histograms and starvation signals
//!   (feature `telemetry`, on by default)
//! - **Execution trace**: serializable record of every scheduling decision

// Lint configuration
#![warn(missing_debug_implementations)]

pub mod config;
pub mod coop;
pub mod error;
pub mod executor;
pub mod prelude;
pub mod queue;
pub mod telemetry;

// Re-export key types at crate root
pub use config::{Config, ConfigBuilder, ResumePolicy};
pub use coop::{Checkpoint, CooperativeScheduler, Report, Routine, RoutineId, Step, Turn};
pub use error::{BoxError, Error, Result};
pub use executor::{WorkItem, WorkerPool};
pub use queue::BlockingWorkQueue;
