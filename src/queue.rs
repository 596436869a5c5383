//! In-memory command mailbox drained by the game server's poll.
//!
//! Single producer path (operator intake), single consumer path (the
//! delivery endpoint). Drains are all-or-nothing: the whole backlog is
//! swapped out under the lock, so a command is never seen by two drains
//! and never lost between a read and the reset.
//!
//! The queue is unbounded. If the game server stops polling, commands
//! accumulate until the process restarts.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::models::command::Command;

/// FIFO holding area for commands awaiting delivery.
#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: Mutex<Vec<Command>>,
}

impl CommandQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command to the tail.
    pub fn enqueue(&self, command: Command) {
        self.lock().push(command);
    }

    /// Take every pending command in enqueue order, leaving the queue empty.
    #[must_use]
    pub fn drain_all(&self) -> Vec<Command> {
        std::mem::take(&mut *self.lock())
    }

    /// Number of pending commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no commands are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave the Vec half-updated,
    // so a poisoned guard is still usable.
    fn lock(&self) -> MutexGuard<'_, Vec<Command>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
