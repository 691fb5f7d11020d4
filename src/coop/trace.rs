//! Execution trace of scheduler decisions, for replay and debugging.

use super::routine::RoutineId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Events that can be recorded in an execution trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceEvent {
    Submitted {
        id: RoutineId,
        timestamp: u64,
    },
    StepStarted {
        id: RoutineId,
        step: u64,
        resumed: bool,
        timestamp: u64,
    },
    Yielded {
        id: RoutineId,
        at: u64,
        timestamp: u64,
    },
    Completed {
        id: RoutineId,
        steps: u64,
        timestamp: u64,
    },
    Faulted {
        id: RoutineId,
        step: u64,
        timestamp: u64,
    },
    Cancelled {
        id: RoutineId,
        timestamp: u64,
    },
}

impl TraceEvent {
    pub fn id(&self) -> RoutineId {
        match self {
            TraceEvent::Submitted { id, .. }
            | TraceEvent::StepStarted { id, .. }
            | TraceEvent::Yielded { id, .. }
            | TraceEvent::Completed { id, .. }
            | TraceEvent::Faulted { id, .. }
            | TraceEvent::Cancelled { id, .. } => *id,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionTrace {
    events: Vec<TraceEvent>,
}

impl ExecutionTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Routine ids in the order their steps were invoked.
    pub fn step_order(&self) -> Vec<RoutineId> {
        self.events
            .iter()
            .filter_map(|e| match e {
                TraceEvent::StepStarted { id, .. } => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub fn events_for(&self, id: RoutineId) -> Vec<&TraceEvent> {
        self.events.iter().filter(|e| e.id() == id).collect()
    }

    /// Save trace to JSON file
    pub fn save(&self, path: &std::path::Path) -> crate::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load trace from JSON file
    pub fn load(path: &std::path::Path) -> crate::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let trace = serde_json::from_str(&json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(trace)
    }
}

/// Trace recorder with a logical clock, shared by the scheduler threads.
#[derive(Debug)]
pub(crate) struct TraceRecorder {
    clock: AtomicU64,
    trace: Mutex<ExecutionTrace>,
}

impl TraceRecorder {
    pub fn new() -> Self {
        Self {
            clock: AtomicU64::new(0),
            trace: Mutex::new(ExecutionTrace::new()),
        }
    }

    pub fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::SeqCst)
    }

    pub fn record(&self, make: impl FnOnce(u64) -> TraceEvent) {
        let mut trace = self.trace.lock();
        // tick under the lock so timestamps follow event order
        let timestamp = self.tick();
        trace.record(make(timestamp));
    }

    pub fn snapshot(&self) -> ExecutionTrace {
        self.trace.lock().clone()
    }
}
