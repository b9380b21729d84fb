use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Fixed-capacity FIFO shared between producers and consumers.
///
/// Producers block in [`insert`](BoundedQueue::insert) while the queue is full, consumers
/// block in [`remove`](BoundedQueue::remove) while it is empty. Blocking is the only
/// back-pressure mechanism: there is no timeout and nothing is ever dropped.
///
/// [`is_full`](BoundedQueue::is_full) and [`is_empty`](BoundedQueue::is_empty) read a
/// snapshot of the item count without taking the lock. They race with concurrent
/// inserts and removes and are meant for sampling, not for synchronization.
#[derive(Debug)]
pub struct BoundedQueue<T> {
    state: Mutex<State<T>>,

    // notified whenever an item is removed or the queue is closed
    not_full: Condvar,

    // notified whenever an item is inserted, the queue is closed
    // or a consumer has to re-check its cancellation predicate
    not_empty: Condvar,

    // mirror of `state.items.len()`, only written while holding `state`
    count: AtomicUsize,

    capacity: usize,
}

#[derive(Debug)]
struct State<T> {
    items: VecDeque<T>,
    closed: bool,
}

impl<T> BoundedQueue<T> {
    /// Creates an empty queue holding at most `capacity` items.
    ///
    /// A `capacity` of 0 is raised to 1.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(State {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            count: AtomicUsize::new(0),
            capacity,
        }
    }

    /// Appends `item` at the tail, blocking while the queue is full.
    ///
    /// Wakes one waiting consumer.
    ///
    /// # Errors
    ///
    /// Gives `item` back when the queue has been [closed](BoundedQueue::close).
    pub fn insert(&self, item: T) -> Result<(), T> {
        let mut state = self.lock();

        while state.items.len() >= self.capacity && !state.closed {
            state = self
                .not_full
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }

        if state.closed {
            return Err(item);
        }

        state.items.push_back(item);
        self.count.store(state.items.len(), Ordering::Release);
        drop(state);

        self.not_empty.notify_one();
        Ok(())
    }

    /// Pops the head, blocking while the queue is empty.
    ///
    /// Wakes one waiting producer. Returns `None` only once the queue is closed and
    /// drained.
    pub fn remove(&self) -> Option<T> {
        self.remove_unless(|| false)
    }

    /// Same as [`remove`](BoundedQueue::remove), but gives up without dequeuing as soon as
    /// `cancelled` returns `true`.
    ///
    /// `cancelled` is evaluated with the queue lock held, before blocking and after every
    /// wake-up. Whoever flips the state observed by `cancelled` has to call
    /// [`wake_consumers`](BoundedQueue::wake_consumers) afterwards.
    pub fn remove_unless<F>(&self, cancelled: F) -> Option<T>
    where
        F: Fn() -> bool,
    {
        let mut state = self.lock();

        loop {
            if cancelled() {
                // a notification meant for an item may have landed on us
                if !state.items.is_empty() {
                    self.not_empty.notify_one();
                }
                return None;
            }

            if let Some(item) = state.items.pop_front() {
                self.count.store(state.items.len(), Ordering::Release);
                drop(state);
                self.not_full.notify_one();
                return Some(item);
            }

            if state.closed {
                return None;
            }

            state = self
                .not_empty
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Wakes every blocked consumer so it re-evaluates its cancellation predicate.
    pub fn wake_consumers(&self) {
        // taking the lock orders this wake-up after any predicate check in progress
        let _state = self.lock();
        self.not_empty.notify_all();
    }

    /// Closes the queue.
    ///
    /// Pending and future inserts fail, consumers drain what is left and then get `None`.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        drop(state);

        self.not_full.notify_all();
        self.not_empty.notify_all();
    }

    /// `true` once [`close`](BoundedQueue::close) was called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Snapshot: the queue holds `capacity` items.
    #[must_use]
    #[inline]
    pub fn is_full(&self) -> bool {
        self.count.load(Ordering::Acquire) >= self.capacity
    }

    /// Snapshot: the queue holds no item.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count.load(Ordering::Acquire) == 0
    }

    /// Snapshot of the number of queued items.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Maximum number of queued items.
    #[must_use]
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
