use std::collections::VecDeque;

use crate::tree::NodeId;

/// Deferred work, run after the current host operation completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Dispatch the node again
    Redecorate(NodeId),
    /// `deallocate_all` then relabel every sense and subsense in document order
    Relabel,
    /// Regenerate the insertion controls of a node
    RefreshAbsences(NodeId),
}

/// FIFO of zero-delay continuations. Queuing a task already waiting is a no-op.
#[derive(Debug, Default)]
pub struct Scheduler {
    queue: VecDeque<Task>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, task: Task) {
        if !self.queue.contains(&task) {
            self.queue.push_back(task);
        }
    }

    pub fn pop(&mut self) -> Option<Task> {
        self.queue.pop_front()
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}
