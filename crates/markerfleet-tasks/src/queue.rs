//! Shared hand-off queue between scanners (producers) and carriers (consumers).

use std::collections::{HashSet, VecDeque};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use log::debug;
use markerfleet_core::Task;

/// Why [`TaskQueue::take`] returned without a task.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TakeError {
    #[error("no task became available within {0:?}")]
    TimedOut(Duration),
    #[error("task queue is closed and drained")]
    Closed,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<Task>,
    /// Every key ever accepted this run, including already-taken ones.
    published: HashSet<String>,
    taken: usize,
    closed: bool,
}

/// Deduplicating, at-most-once task queue.
///
/// - [`publish`](Self::publish) accepts a key at most once per queue lifetime.
/// - [`take`](Self::take) hands each accepted task to exactly one caller.
/// - Insertion order is honored best-effort.
///
/// Share it between agent threads with `Arc<TaskQueue>`; callers need no
/// extra locking.
#[derive(Default)]
pub struct TaskQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert `task` unless its key was already published (or the queue is closed).
    ///
    /// Returns `true` when the task was accepted.
    pub fn publish(&self, task: Task) -> bool {
        let mut state = self.lock();
        if state.closed {
            debug!("queue closed, dropping task {}", task.key());
            return false;
        }
        if !state.published.insert(task.key().to_owned()) {
            return false;
        }
        state.pending.push_back(task);
        drop(state);
        self.available.notify_one();
        true
    }

    /// Block until a task is available, the timeout elapses or the queue closes.
    pub fn take(&self, timeout: Duration) -> Result<Task, TakeError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        loop {
            if let Some(task) = state.pending.pop_front() {
                state.taken += 1;
                return Ok(task);
            }
            if state.closed {
                return Err(TakeError::Closed);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(TakeError::TimedOut(timeout));
            }
            state = self
                .available
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Non-blocking variant of [`take`](Self::take).
    pub fn try_take(&self) -> Option<Task> {
        let mut state = self.lock();
        let task = state.pending.pop_front()?;
        state.taken += 1;
        Some(task)
    }

    /// Stop accepting tasks and wake every blocked consumer.
    ///
    /// Tasks already pending can still be taken.
    pub fn close(&self) {
        self.lock().closed = true;
        self.available.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Pending task count. Advisory: may be stale as soon as it returns.
    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct keys accepted so far.
    pub fn published_count(&self) -> usize {
        self.lock().published.len()
    }

    /// Number of tasks handed to consumers so far.
    pub fn taken_count(&self) -> usize {
        self.lock().taken
    }

    /// True if `key` was ever accepted, whether or not it was taken since.
    pub fn was_published(&self, key: &str) -> bool {
        self.lock().published.contains(key)
    }
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("TaskQueue")
            .field("pending", &state.pending.len())
            .field("published", &state.published.len())
            .field("taken", &state.taken)
            .field("closed", &state.closed)
            .finish()
    }
}
