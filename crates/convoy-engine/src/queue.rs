//! Mutex + condvar FIFO feeding the controller's dispatch loop.
//!
//! [`EventQueue`] is the only structure shared between producers and the
//! consumer. Every mutation happens under its single mutex; the condvar is
//! signalled on each insertion and on close. Consumers wait with a
//! predicate, so spurious wakeups are harmless.
//!
//! The queue is generic so ordering can be tested with tagged items; the
//! controller instantiates it with [`Event`](convoy_core::Event).

use std::collections::VecDeque;
use std::error::Error;
use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use convoy_core::{Event, ScheduleError};

/// Rejected insertion. The item is handed back to the caller.
#[derive(PartialEq, Eq)]
pub enum EnqueueError<T> {
    /// The queue has been closed.
    Closed(T),
    /// The queue is bounded and at capacity.
    Full(T),
}

impl<T> EnqueueError<T> {
    /// Recover the rejected item.
    pub fn into_inner(self) -> T {
        match self {
            Self::Closed(item) | Self::Full(item) => item,
        }
    }
}

impl<T> fmt::Debug for EnqueueError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed(_) => f.write_str("Closed(..)"),
            Self::Full(_) => f.write_str("Full(..)"),
        }
    }
}

impl<T> fmt::Display for EnqueueError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed(_) => write!(f, "queue is closed"),
            Self::Full(_) => write!(f, "queue is full"),
        }
    }
}

impl<T> Error for EnqueueError<T> {}

impl From<EnqueueError<Event>> for ScheduleError {
    fn from(e: EnqueueError<Event>) -> Self {
        match e {
            EnqueueError::Closed(_) => Self::Closed,
            EnqueueError::Full(_) => Self::Full,
        }
    }
}

/// What a blocking dequeue produced.
#[derive(Debug, PartialEq, Eq)]
pub enum Dequeued<T> {
    /// The head of the queue.
    Item(T),
    /// The queue is closed and empty.
    Shutdown,
}

struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Thread-safe FIFO with blocking dequeue.
///
/// `push` never waits beyond mutex contention. A bounded queue rejects
/// with [`EnqueueError::Full`] rather than blocking the producer.
pub struct EventQueue<T> {
    state: Mutex<QueueState<T>>,
    available: Condvar,
    capacity: Option<usize>,
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl<T> EventQueue<T> {
    /// Queue with no capacity limit.
    pub fn unbounded() -> Self {
        Self::with_capacity(None)
    }

    /// Queue holding at most `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn bounded(capacity: usize) -> Self {
        assert!(capacity > 0, "EventQueue capacity must be at least 1");
        Self::with_capacity(Some(capacity))
    }

    pub(crate) fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity.unwrap_or(64).min(1024)),
                closed: false,
            }),
            available: Condvar::new(),
            capacity,
        }
    }

    // A panic while holding the lock cannot leave the deque half-updated:
    // every critical section is a single push, pop, or flag store.
    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `item` at the tail and wake one waiting consumer.
    pub fn push(&self, item: T) -> Result<(), EnqueueError<T>> {
        let mut state = self.lock();
        if state.closed {
            return Err(EnqueueError::Closed(item));
        }
        if let Some(cap) = self.capacity {
            if state.items.len() >= cap {
                return Err(EnqueueError::Full(item));
            }
        }
        state.items.push_back(item);
        drop(state);
        self.available.notify_one();
        Ok(())
    }

    /// Block until an item is available or the queue is closed.
    ///
    /// Items pushed before [`close()`](Self::close) are still delivered;
    /// [`Dequeued::Shutdown`] is returned only once the queue is closed
    /// *and* empty.
    pub fn wait_and_dequeue(&self) -> Dequeued<T> {
        let guard = self.lock();
        let mut state = self
            .available
            .wait_while(guard, |s| s.items.is_empty() && !s.closed)
            .unwrap_or_else(PoisonError::into_inner);
        match state.items.pop_front() {
            Some(item) => Dequeued::Item(item),
            None => Dequeued::Shutdown,
        }
    }

    /// Like [`wait_and_dequeue()`](Self::wait_and_dequeue) but gives up
    /// after `timeout`, returning `None`.
    pub fn wait_and_dequeue_timeout(&self, timeout: Duration) -> Option<Dequeued<T>> {
        let guard = self.lock();
        let (mut state, _) = self
            .available
            .wait_timeout_while(guard, timeout, |s| s.items.is_empty() && !s.closed)
            .unwrap_or_else(PoisonError::into_inner);
        match state.items.pop_front() {
            Some(item) => Some(Dequeued::Item(item)),
            None if state.closed => Some(Dequeued::Shutdown),
            None => None,
        }
    }

    /// Pop the head without waiting.
    pub fn try_dequeue(&self) -> Option<T> {
        self.lock().items.pop_front()
    }

    /// Refuse further pushes and wake every waiter.
    pub fn close(&self) {
        self.lock().closed = true;
        self.available.notify_all();
    }

    /// Whether [`close()`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Remove and return everything still queued, in order.
    pub fn drain(&self) -> Vec<T> {
        self.lock().items.drain(..).collect()
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Capacity limit, `None` when unbounded.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

// Compile-time assertion: the queue is shared across threads by `Arc`.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<EventQueue<Event>>();
};
