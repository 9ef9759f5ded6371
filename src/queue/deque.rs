//! Blocking double-ended queue
//!
//! A `VecDeque` behind a single mutex, with two condition variables bound
//! to that same mutex: `not_empty` parks poppers, `not_full` parks pushers
//! on a bounded deque. The lifecycle flags (closed, aborted) live under the
//! same lock, so a close can never slip between a popper's emptiness check
//! and its wait.

use crate::error::{CopyToolError, Result};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Error returned by a push on a closed or aborted deque
///
/// Carries the rejected item back to the caller.
#[derive(PartialEq, Eq)]
pub struct PushError<T>(pub T);

impl<T> PushError<T> {
    /// Recover the item that could not be pushed
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PushError(..)")
    }
}

impl<T> fmt::Display for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("push on a closed queue")
    }
}

impl<T> std::error::Error for PushError<T> {}

/// Which end of the deque an operation works on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum End {
    Front,
    Back,
}

struct State<T> {
    items: VecDeque<T>,
    closed: bool,
    aborted: bool,
}

impl<T> State<T> {
    fn take(&mut self, end: End) -> Option<T> {
        match end {
            End::Front => self.items.pop_front(),
            End::Back => self.items.pop_back(),
        }
    }

    /// Nothing left to wait for: either an item is ready or none will come
    fn ready_for_pop(&self) -> bool {
        !self.items.is_empty() || self.closed
    }
}

/// Thread-safe double-ended queue with blocking pops and optional backpressure
///
/// Any number of threads may push and pop concurrently. Each pushed item is
/// returned by exactly one pop. With `push_back` and `pop_front` only, items
/// come out in the order they went in.
///
/// # Example
/// ```
/// use copytool::queue::BlockingDeque;
/// use std::sync::Arc;
/// use std::thread;
///
/// let queue = Arc::new(BlockingDeque::bounded(8));
/// let producer = {
///     let queue = Arc::clone(&queue);
///     thread::spawn(move || {
///         for i in 0..100 {
///             queue.push_back(i).unwrap();
///         }
///         queue.close();
///     })
/// };
///
/// let mut received = Vec::new();
/// while let Some(item) = queue.pop_front() {
///     received.push(item);
/// }
/// producer.join().unwrap();
/// assert_eq!(received, (0..100).collect::<Vec<_>>());
/// ```
pub struct BlockingDeque<T> {
    state: Mutex<State<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: Option<usize>,
}

impl<T> BlockingDeque<T> {
    /// Create an unbounded deque; pushes never block
    pub fn new() -> Self {
        Self::with_capacity(None)
    }

    /// Create a deque holding at most `capacity` items
    ///
    /// A capacity of zero is treated as one, since nothing could ever be
    /// pushed otherwise.
    pub fn bounded(capacity: usize) -> Self {
        Self::with_capacity(Some(capacity.max(1)))
    }

    /// Create a deque with an optional bound
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        let initial = capacity.unwrap_or(0);
        Self {
            state: Mutex::new(State {
                items: VecDeque::with_capacity(initial),
                closed: false,
                aborted: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        }
    }

    // A panic while holding the lock cannot leave the VecDeque half-updated,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_full(&self, state: &State<T>) -> bool {
        self.capacity.is_some_and(|cap| state.items.len() >= cap)
    }

    fn push(&self, item: T, end: End) -> std::result::Result<(), PushError<T>> {
        let mut state = self.lock();
        while !state.closed && self.is_full(&state) {
            state = self
                .not_full
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if state.closed {
            return Err(PushError(item));
        }

        match end {
            End::Front => state.items.push_front(item),
            End::Back => state.items.push_back(item),
        }
        drop(state);

        self.not_empty.notify_one();
        Ok(())
    }

    fn pop(&self, end: End) -> Option<T> {
        let mut state = self.lock();
        while !state.ready_for_pop() {
            state = self
                .not_empty
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }

        let item = state.take(end);
        drop(state);

        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    fn pop_timeout(&self, end: End, timeout: Duration) -> Result<Option<T>> {
        // A timeout past the end of the clock waits like an untimed pop
        let deadline = match Instant::now().checked_add(timeout) {
            Some(deadline) => deadline,
            None => return Ok(self.pop(end)),
        };
        let mut state = self.lock();
        while !state.ready_for_pop() {
            let now = Instant::now();
            if now >= deadline {
                return Err(CopyToolError::Timeout(timeout));
            }
            state = self
                .not_empty
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }

        let item = state.take(end);
        drop(state);

        if item.is_some() {
            self.not_full.notify_one();
        }
        Ok(item)
    }

    fn try_pop(&self, end: End) -> Option<T> {
        let item = self.lock().take(end);
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    /// Append an item, blocking while a bounded deque is full
    ///
    /// Fails only if the deque is closed, either before the call or while
    /// waiting for room.
    pub fn push_back(&self, item: T) -> std::result::Result<(), PushError<T>> {
        self.push(item, End::Back)
    }

    /// Prepend an item, blocking while a bounded deque is full
    pub fn push_front(&self, item: T) -> std::result::Result<(), PushError<T>> {
        self.push(item, End::Front)
    }

    /// Remove the head item, blocking while the deque is empty and open
    ///
    /// Returns `None` once the deque is closed and drained, or aborted.
    pub fn pop_front(&self) -> Option<T> {
        self.pop(End::Front)
    }

    /// Remove the tail item, blocking while the deque is empty and open
    pub fn pop_back(&self) -> Option<T> {
        self.pop(End::Back)
    }

    /// `pop_front` that gives up with [`CopyToolError::Timeout`] after `timeout`
    pub fn pop_front_timeout(&self, timeout: Duration) -> Result<Option<T>> {
        self.pop_timeout(End::Front, timeout)
    }

    /// `pop_back` that gives up with [`CopyToolError::Timeout`] after `timeout`
    pub fn pop_back_timeout(&self, timeout: Duration) -> Result<Option<T>> {
        self.pop_timeout(End::Back, timeout)
    }

    /// Remove the head item if one is present, without waiting
    pub fn try_pop_front(&self) -> Option<T> {
        self.try_pop(End::Front)
    }

    /// Remove the tail item if one is present, without waiting
    pub fn try_pop_back(&self) -> Option<T> {
        self.try_pop(End::Back)
    }

    /// Check if the deque holds no items
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Number of items currently held
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Maximum number of items, `None` when unbounded
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Drop every item
    pub fn clear(&self) {
        self.lock().items.clear();
        self.not_full.notify_all();
    }

    /// Mark the end of input
    ///
    /// Later pushes fail; pops keep draining what is left and then return
    /// `None`. Every parked thread is woken so it can observe the change.
    pub fn close(&self) {
        self.lock().closed = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Check if [`close`](Self::close) or [`abort`](Self::abort) was called
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// True once the deque is closed and nothing is left to pop
    pub fn is_drained_and_closed(&self) -> bool {
        let state = self.lock();
        state.closed && state.items.is_empty()
    }

    /// Close the deque and discard pending items
    ///
    /// Used to tear a pipeline down: parked pushers and poppers all return
    /// immediately.
    pub fn abort(&self) {
        let discarded = {
            let mut state = self.lock();
            state.closed = true;
            state.aborted = true;
            std::mem::take(&mut state.items)
        };
        self.not_empty.notify_all();
        self.not_full.notify_all();
        drop(discarded);
    }

    /// Check if [`abort`](Self::abort) was called
    pub fn is_aborted(&self) -> bool {
        self.lock().aborted
    }
}

impl<T: Clone> BlockingDeque<T> {
    /// Snapshot of the head item
    pub fn front(&self) -> Result<T> {
        self.lock()
            .items
            .front()
            .cloned()
            .ok_or(CopyToolError::EmptyQueue)
    }

    /// Snapshot of the tail item
    pub fn back(&self) -> Result<T> {
        self.lock()
            .items
            .back()
            .cloned()
            .ok_or(CopyToolError::EmptyQueue)
    }
}

impl<T> Default for BlockingDeque<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for BlockingDeque<T> {
    fn drop(&mut self) {
        self.state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .items
            .clear();
    }
}

impl<T> fmt::Debug for BlockingDeque<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("BlockingDeque")
            .field("len", &state.items.len())
            .field("capacity", &self.capacity)
            .field("closed", &state.closed)
            .field("aborted", &state.aborted)
            .finish()
    }
}
