use std::io::Result as IoResult;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::WorkerPool;
use crate::log;
use crate::util::BoundedQueue;

/// Default pause of the controller loop after a round without resize.
pub const POLL_INTERVAL_DEFAULT: Duration = Duration::from_millis(1);

/// Source of the pressure samples the [`PoolController`] decides on.
///
/// Implemented by [`BoundedQueue`]. Both predicates are snapshots and may race with
/// the queue traffic.
pub trait QueuePressure: Send + Sync {
    /// No room left for another item.
    fn is_full(&self) -> bool;
    /// No item waiting.
    fn is_empty(&self) -> bool;
}

impl<T: Send> QueuePressure for BoundedQueue<T> {
    #[inline]
    fn is_full(&self) -> bool {
        BoundedQueue::is_full(self)
    }

    #[inline]
    fn is_empty(&self) -> bool {
        BoundedQueue::is_empty(self)
    }
}

/// Outcome of one controller round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resize {
    /// Full queue: the pool doubles, capped at the maximum.
    Grow {
        /// `numthread` before
        from: usize,
        /// `numthread` after
        to: usize,
    },
    /// Empty queue: the pool halves.
    Shrink {
        /// `numthread` before
        from: usize,
        /// `numthread` after
        to: usize,
    },
    /// Full queue but the pool is at its maximum already.
    Saturated,
    /// Nothing to do.
    Hold,
}

impl Resize {
    /// Decides the next pool size from one pressure sample.
    ///
    /// A full queue doubles `numthread` (capped at `max`), an empty queue halves it
    /// (not below 1). Every other case holds.
    #[must_use]
    pub fn decide(numthread: usize, max: usize, full: bool, empty: bool) -> Self {
        if full {
            if numthread >= max {
                Self::Saturated
            } else {
                Self::Grow {
                    from: numthread,
                    to: numthread.saturating_mul(2).min(max),
                }
            }
        } else if empty && numthread > 1 {
            Self::Shrink {
                from: numthread,
                to: numthread / 2,
            }
        } else {
            Self::Hold
        }
    }
}

/// Feedback loop resizing a [`WorkerPool`] from queue pressure.
///
/// The controller is the only writer of the pool size. Each round samples the
/// pressure once and applies the decision completely, including worker activation or
/// cancellation, before the next sample is taken.
///
/// The sample and the resize are not atomic with respect to the queue traffic: a grow
/// may race a draining queue and a shrink may race new inserts. The pool size only
/// has to follow the load's order of magnitude.
pub struct PoolController<T> {
    pool: Arc<WorkerPool<T>>,
    pressure: Arc<dyn QueuePressure>,
    poll_interval: Duration,
}

impl<T: Send + 'static> PoolController<T> {
    /// Creates a controller for `pool` driven by the pool's own queue.
    #[must_use]
    pub fn new(pool: Arc<WorkerPool<T>>, poll_interval: Duration) -> Self {
        let queue = Arc::clone(pool.queue());
        Self::with_pressure(pool, queue, poll_interval)
    }

    /// Creates a controller for `pool` deciding on samples from `pressure`.
    #[must_use]
    pub fn with_pressure(
        pool: Arc<WorkerPool<T>>,
        pressure: Arc<dyn QueuePressure>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            pool,
            pressure,
            poll_interval,
        }
    }

    /// The controlled pool.
    #[must_use]
    pub fn pool(&self) -> &Arc<WorkerPool<T>> {
        &self.pool
    }

    /// Runs one sample-decide-apply round.
    pub fn step(&self) -> Resize {
        let decision = Resize::decide(
            self.pool.numthread(),
            self.pool.max_workers(),
            self.pressure.is_full(),
            self.pressure.is_empty(),
        );

        match decision {
            Resize::Grow { from, to } => {
                if let Err(err) = self.pool.grow_to(to) {
                    log::error!("pool growth {from} -> {to} failed: {err:?}");
                    return Resize::Hold;
                }
                log::debug!("pool grown {from} -> {to}");
            }
            Resize::Shrink { from, to } => {
                self.pool.shrink_to(to);
                log::debug!("pool shrunk {from} -> {to}");
            }
            Resize::Saturated | Resize::Hold => {}
        }

        decision
    }

    /// Runs rounds until `close` is set.
    ///
    /// Sleeps `poll_interval` after every round that did not resize.
    pub fn run(&self, close: &AtomicBool) {
        let mut saturated = false;

        while !close.load(Ordering::Acquire) {
            match self.step() {
                Resize::Grow { .. } | Resize::Shrink { .. } => {
                    saturated = false;
                    continue;
                }
                Resize::Saturated => {
                    if !saturated {
                        log::warn!(
                            "queue full with {} workers, can't grow the pool",
                            self.pool.numthread()
                        );
                        saturated = true;
                    }
                }
                Resize::Hold => saturated = false,
            }

            thread::sleep(self.poll_interval);
        }

        log::debug!("pool controller stopped");
    }

    /// Moves the controller to a dedicated thread running [`run`](PoolController::run).
    ///
    /// # Errors
    ///
    /// `std::io::Error` when the thread can't be spawned
    pub fn spawn(self, close: Arc<AtomicBool>) -> IoResult<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name("pool-controller".to_owned())
            .spawn(move || self.run(&close))
    }
}

impl<T> std::fmt::Debug for PoolController<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolController")
            .field("pool", &self.pool)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}
