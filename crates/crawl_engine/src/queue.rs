//! Unbounded (optionally capped) FIFO work queue with join semantics.
//!
//! Every item taken with [`WorkQueue::get`] must be acknowledged with exactly
//! one [`WorkQueue::task_done`]; [`WorkQueue::join`] waits until every item
//! ever put has been taken and acknowledged. Pipeline stages use
//! [`WorkQueue::claim`], whose [`Ack`] guard acknowledges on drop so no exit
//! path (error, panic, cancellation) can leave an item unacknowledged.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::Notify;

use engine_logging::engine_error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("task_done() called more times than items were taken")]
    TooManyAcks,
}

#[derive(Debug)]
struct QueueState<T> {
    items: VecDeque<T>,
    /// Items handed out by `get` and not yet acknowledged.
    unacked: usize,
    acknowledged: u64,
}

pub struct WorkQueue<T> {
    state: Mutex<QueueState<T>>,
    capacity: Option<usize>,
    item_ready: Notify,
    space_ready: Notify,
    drained: Notify,
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        Self::with_capacity_limit(None)
    }

    /// A queue whose `put` suspends while `capacity` items are waiting.
    pub fn bounded(capacity: usize) -> Self {
        Self::with_capacity_limit(Some(capacity.max(1)))
    }

    fn with_capacity_limit(capacity: Option<usize>) -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                unacked: 0,
                acknowledged: 0,
            }),
            capacity,
            item_ready: Notify::new(),
            space_ready: Notify::new(),
            drained: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `item` at the tail.
    ///
    /// Only suspends on a bounded queue that is currently full.
    pub async fn put(&self, item: T) {
        loop {
            let space = self.space_ready.notified();
            {
                let mut state = self.lock();
                let has_room = self
                    .capacity
                    .map_or(true, |capacity| state.items.len() < capacity);
                if has_room {
                    state.items.push_back(item);
                    drop(state);
                    self.item_ready.notify_one();
                    return;
                }
            }
            space.await;
        }
    }

    /// Removes and returns the head item, suspending until one is available.
    ///
    /// The caller owes the queue one `task_done` for the returned item.
    pub async fn get(&self) -> T {
        loop {
            let ready = self.item_ready.notified();
            if let Some(item) = self.try_get() {
                return item;
            }
            ready.await;
        }
    }

    /// Non-suspending `get`.
    pub fn try_get(&self) -> Option<T> {
        let item = {
            let mut state = self.lock();
            let item = state.items.pop_front()?;
            state.unacked += 1;
            item
        };
        if self.capacity.is_some() {
            self.space_ready.notify_one();
        }
        Some(item)
    }

    /// Like `get`, but hands back an [`Ack`] that calls `task_done` when dropped.
    pub async fn claim(&self) -> (T, Ack<'_, T>) {
        let item = self.get().await;
        (item, Ack { queue: self })
    }

    /// Acknowledges one item previously returned by `get`.
    pub fn task_done(&self) -> Result<(), QueueError> {
        let drained = {
            let mut state = self.lock();
            if state.unacked == 0 {
                return Err(QueueError::TooManyAcks);
            }
            state.unacked -= 1;
            state.acknowledged += 1;
            state.unacked == 0 && state.items.is_empty()
        };
        if drained {
            self.drained.notify_waiters();
        }
        Ok(())
    }

    /// Suspends until every item put so far has been taken and acknowledged.
    pub async fn join(&self) {
        loop {
            let drained = self.drained.notified();
            tokio::pin!(drained);
            drained.as_mut().enable();
            if self.in_flight() == 0 {
                return;
            }
            drained.await;
        }
    }

    /// Items waiting to be taken.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Items put but not yet acknowledged.
    pub fn in_flight(&self) -> usize {
        let state = self.lock();
        state.items.len() + state.unacked
    }

    /// Total number of `task_done` calls so far.
    pub fn acknowledged(&self) -> u64 {
        self.lock().acknowledged
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for WorkQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("WorkQueue")
            .field("waiting", &state.items.len())
            .field("unacked", &state.unacked)
            .field("acknowledged", &state.acknowledged)
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// Acknowledges one claimed item when dropped.
#[must_use = "dropping the Ack acknowledges the item immediately"]
pub struct Ack<'q, T> {
    queue: &'q WorkQueue<T>,
}

impl<T> Drop for Ack<'_, T> {
    fn drop(&mut self) {
        if let Err(err) = self.queue.task_done() {
            engine_error!("Queue acknowledgement failed: {}", err);
        }
    }
}
