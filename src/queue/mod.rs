//! Work queues shared between submitters and worker threads.

pub mod blocking;

pub use blocking::{BlockingWorkQueue, Take};
