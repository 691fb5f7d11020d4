pub use crate::config::{Config, ConfigBuilder, ResumePolicy};
pub use crate::coop::{
    from_fn, Checkpoint, CooperativeScheduler, Report, Routine, RoutineId, Step, StepResult,
    Transition, Turn,
};
pub use crate::error::{BoxError, Error, Result};
pub use crate::executor::{PanicStrategy, WorkItem, WorkerPool};
pub use crate::queue::BlockingWorkQueue;
pub use crate::telemetry::{Metrics, MetricsSnapshot};
