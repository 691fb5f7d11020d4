//! Routines that have yielded and wait to be resumed.

use super::routine::{Checkpoint, RoutineId};
use super::task::RoutineTask;
use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::time::Instant;

struct Entry<T> {
    task: RoutineTask<T>,
    checkpoint: Checkpoint,
}

// Reverse ordering for min-heap (earliest wake time first)
#[derive(PartialEq, Eq)]
struct Sleeper {
    wake_at: Instant,
    order: u64,
    id: RoutineId,
}

impl Ord for Sleeper {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .wake_at
            .cmp(&self.wake_at)
            .then_with(|| other.order.cmp(&self.order))
    }
}

impl PartialOrd for Sleeper {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Yielded routines keyed by id, resumed oldest-first.
///
/// Entries whose checkpoint asked for a delay sit in a timer heap and join
/// the tail of the ready order once their wake time has passed.
pub struct PendingTable<T> {
    entries: HashMap<RoutineId, Entry<T>>,
    ready: VecDeque<RoutineId>,
    sleeping: BinaryHeap<Sleeper>,
    inserted: u64,
}

impl<T: Send + 'static> PendingTable<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            ready: VecDeque::new(),
            sleeping: BinaryHeap::new(),
            inserted: 0,
        }
    }

    /// Add a yielded routine at the tail of the resume order.
    ///
    /// A routine already present is left untouched and the new insert is
    /// rejected.
    pub fn insert(&mut self, task: RoutineTask<T>, checkpoint: Checkpoint, now: Instant) -> Result<()> {
        let id = task.id();
        if self.entries.contains_key(&id) {
            return Err(Error::violation(format!("{} is already pending", id)));
        }

        self.inserted += 1;
        match checkpoint.delay() {
            Some(delay) if !delay.is_zero() => self.sleeping.push(Sleeper {
                wake_at: now + delay,
                order: self.inserted,
                id,
            }),
            _ => self.ready.push_back(id),
        }
        self.entries.insert(id, Entry { task, checkpoint });
        Ok(())
    }

    /// Move every sleeper whose wake time has passed to the ready tail.
    pub fn promote_due(&mut self, now: Instant) {
        while let Some(sleeper) = self.sleeping.peek() {
            if sleeper.wake_at > now {
                break;
            }
            if let Some(sleeper) = self.sleeping.pop() {
                self.ready.push_back(sleeper.id);
            }
        }
    }

    /// Remove the earliest-inserted routine that is ready to resume.
    pub fn pop_ready(&mut self, now: Instant) -> Option<(RoutineTask<T>, Checkpoint)> {
        self.promote_due(now);
        while let Some(id) = self.ready.pop_front() {
            if let Some(entry) = self.entries.remove(&id) {
                return Some((entry.task, entry.checkpoint));
            }
        }
        None
    }

    pub fn has_ready(&mut self, now: Instant) -> bool {
        self.promote_due(now);
        !self.ready.is_empty()
    }

    /// Earliest wake time among deferred entries.
    pub fn next_wake(&self) -> Option<Instant> {
        self.sleeping.peek().map(|s| s.wake_at)
    }

    pub fn remove(&mut self, id: RoutineId) -> Option<RoutineTask<T>> {
        let entry = self.entries.remove(&id)?;
        self.ready.retain(|r| *r != id);
        self.sleeping.retain(|s| s.id != id);
        Some(entry.task)
    }

    pub fn contains(&self, id: RoutineId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pending ids in the order they would be resumed if all were ready now.
    pub fn ids(&self) -> Vec<RoutineId> {
        let mut sleepers: Vec<&Sleeper> = self.sleeping.iter().collect();
        sleepers.sort_by(|a, b| b.cmp(a));
        self.ready
            .iter()
            .copied()
            .chain(sleepers.into_iter().map(|s| s.id))
            .collect()
    }
}

impl<T: Send + 'static> Default for PendingTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for PendingTable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingTable")
            .field("len", &self.entries.len())
            .field("ready", &self.ready.len())
            .field("sleeping", &self.sleeping.len())
            .finish()
    }
}
