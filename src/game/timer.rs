//! Scheduled tasks.
//!
//! A time-ordered queue drained at the top of every tick. Tasks carry ids,
//! never references, and are ignored when their entity is gone.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::core::ids::EntityId;

/// Work the world performs when a task comes due.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TaskKind {
    /// Re-evaluate the heading of an animal
    Reaim {
        /// Animal to steer
        id: EntityId,
        /// Spawn serial the task was scheduled for
        serial: u64,
    },
    /// Return a quarantined id to the allocator
    ReleaseId(EntityId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Scheduled {
    due_ms: u64,
    seq: u64,
    kind: TaskKind,
}

/// Min-queue of tasks keyed by due time, FIFO among equal due times.
#[derive(Debug, Default)]
pub struct Scheduler {
    queue: BinaryHeap<Reverse<Scheduled>>,
    seq: u64,
}

impl Scheduler {
    /// Empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `kind` to run at or after `due_ms`.
    pub fn schedule(&mut self, due_ms: u64, kind: TaskKind) {
        self.seq += 1;
        self.queue.push(Reverse(Scheduled { due_ms, seq: self.seq, kind }));
    }

    /// Pop the earliest task due at `now_ms`, if any.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<TaskKind> {
        match self.queue.peek() {
            Some(Reverse(task)) if task.due_ms <= now_ms => {
                self.queue.pop().map(|Reverse(task)| task.kind)
            }
            _ => None,
        }
    }

    /// Due time of the earliest task.
    pub fn next_due(&self) -> Option<u64> {
        self.queue.peek().map(|Reverse(task)| task.due_ms)
    }

    /// Number of queued tasks.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// True if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pops_in_due_order() {
        let mut s = Scheduler::new();
        s.schedule(300, TaskKind::ReleaseId(3));
        s.schedule(100, TaskKind::ReleaseId(1));
        s.schedule(200, TaskKind::ReleaseId(2));

        assert_eq!(s.next_due(), Some(100));
        assert_eq!(s.pop_due(250), Some(TaskKind::ReleaseId(1)));
        assert_eq!(s.pop_due(250), Some(TaskKind::ReleaseId(2)));
        assert_eq!(s.pop_due(250), None);
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_equal_due_times_are_fifo() {
        let mut s = Scheduler::new();
        s.schedule(50, TaskKind::ReleaseId(9));
        s.schedule(50, TaskKind::Reaim { id: 1, serial: 0 });
        assert_eq!(s.pop_due(50), Some(TaskKind::ReleaseId(9)));
        assert_eq!(s.pop_due(50), Some(TaskKind::Reaim { id: 1, serial: 0 }));
        assert!(s.is_empty());
    }
}
