//! Pre-threaded worker pool resized by a [`PoolController`]
//!
//! The pool owns a fixed arena of `max_workers` [`WorkerSlot`]s. Slots below
//! [`numthread`](WorkerPool::numthread) are serviced by one worker thread each, the
//! others are idle. Only the controller moves `numthread`, by doubling or halving.
//!
//! A worker loops over: take its slot lock, check for cancellation, remove one item
//! from the [`BoundedQueue`], hand it to the [`RequestHandler`], drop it, release the
//! lock. The lock spans the blocking removal too, so taking it from the outside means
//! waiting for the worker to leave service.

use std::io::Result as IoResult;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

pub use controller::{PoolController, QueuePressure, Resize, POLL_INTERVAL_DEFAULT};
pub use slot::{SlotState, WorkerSlot};

use crate::log;
use crate::util::{BoundedQueue, Registration};
use crate::RequestHandler;
use slot::Activation;

mod controller;
mod slot;

/// Default number of workers at start.
pub const INITIAL_WORKERS_DEFAULT: usize = 1;
/// Default hard maximum of workers.
pub const MAX_WORKERS_DEFAULT: usize = 1024;

/// Set of worker slots consuming one [`BoundedQueue`].
pub struct WorkerPool<T> {
    shared: Arc<Shared<T>>,
}

struct Shared<T> {
    queue: Arc<BoundedQueue<T>>,
    handler: Arc<dyn RequestHandler<T>>,

    // arena sized to the maximum, never resized
    slots: Box<[WorkerSlot]>,

    // slots with an index below are serviced
    numthread: AtomicUsize,

    // worker threads currently alive, including cancelled ones still finishing
    threads_live: AtomicUsize,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Creates the slot arena and starts `initial` workers on `queue`.
    ///
    /// `max` is raised to 1 if 0, `initial` is clamped into `1..=max`.
    ///
    /// # Errors
    ///
    /// `std::io::Error` when a worker thread can't be spawned
    pub fn new(
        queue: Arc<BoundedQueue<T>>,
        handler: Arc<dyn RequestHandler<T>>,
        initial: usize,
        max: usize,
    ) -> IoResult<Self> {
        let max = max.max(1);
        let initial = initial.clamp(1, max);

        let pool = Self {
            shared: Arc::new(Shared {
                queue,
                handler,
                slots: (0..max).map(WorkerSlot::new).collect(),
                numthread: AtomicUsize::new(0),
                threads_live: AtomicUsize::new(0),
            }),
        };

        pool.grow_to(initial)?;
        Ok(pool)
    }

    /// Number of serviced slots.
    #[must_use]
    #[inline]
    pub fn numthread(&self) -> usize {
        self.shared.numthread.load(Ordering::Acquire)
    }

    /// Size of the slot arena.
    #[must_use]
    #[inline]
    pub fn max_workers(&self) -> usize {
        self.shared.slots.len()
    }

    /// Number of worker threads alive.
    ///
    /// Lags behind [`numthread`](WorkerPool::numthread) while cancelled workers finish.
    #[must_use]
    #[inline]
    pub fn threads_live(&self) -> usize {
        self.shared.threads_live.load(Ordering::Acquire)
    }

    /// Slot at `index`, if `index < max_workers()`.
    #[must_use]
    #[inline]
    pub fn slot(&self, index: usize) -> Option<&WorkerSlot> {
        self.shared.slots.get(index)
    }

    /// The queue the workers consume.
    #[must_use]
    #[inline]
    pub fn queue(&self) -> &Arc<BoundedQueue<T>> {
        &self.shared.queue
    }

    /// Activates the slots in `[numthread, target)`.
    ///
    /// If a thread can't be spawned the slots activated by this call are cancelled
    /// again and `numthread` is left unchanged.
    pub(crate) fn grow_to(&self, target: usize) -> IoResult<()> {
        let current = self.numthread();
        let target = target.min(self.max_workers());

        for index in current..target {
            if let Err(err) = self.activate(index) {
                log::error!("aborted creating worker at slot {index}: {err:?}");
                for rollback in current..index {
                    self.cancel(rollback);
                }
                return Err(err);
            }
            log::debug!("create worker [{index}]");
        }

        self.shared.numthread.store(target, Ordering::Release);
        Ok(())
    }

    /// Cancels the slots in `[target, numthread)`.
    ///
    /// Returns once every cancelled worker is out of service.
    pub(crate) fn shrink_to(&self, target: usize) {
        let current = self.numthread();
        let target = target.max(1);

        for index in target..current {
            log::debug!("cancel worker [{index}]");
            self.cancel(index);
        }

        self.shared.numthread.store(target.min(current), Ordering::Release);
    }

    fn activate(&self, index: usize) -> IoResult<()> {
        let activation = self.shared.slots[index].activate();
        let shared = Arc::clone(&self.shared);
        let worker_activation = Arc::clone(&activation);

        match thread::Builder::new()
            .name(format!("worker-{index}"))
            .spawn(move || work(&shared, index, &worker_activation))
        {
            Ok(_detached) => Ok(()),
            Err(err) => {
                activation.retire();
                Err(err)
            }
        }
    }

    fn cancel(&self, index: usize) {
        let slot = &self.shared.slots[index];
        if !slot.request_cancel() {
            return;
        }

        // the worker may be parked in the queue while holding its lock
        self.shared.queue.wake_consumers();

        // wait for the worker to leave service
        drop(slot.lock());
    }
}

impl<T> std::fmt::Debug for WorkerPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("numthread", &self.shared.numthread.load(Ordering::Relaxed))
            .field("max_workers", &self.shared.slots.len())
            .field(
                "threads_live",
                &self.shared.threads_live.load(Ordering::Relaxed),
            )
            .finish_non_exhaustive()
    }
}

fn work<T>(shared: &Shared<T>, index: usize, activation: &Activation) {
    let _live = Registration::new(&shared.threads_live);
    let slot = &shared.slots[index];

    log::trace!("worker [{index}] running");

    loop {
        let _active = slot.lock();

        if activation.is_cancel_requested() {
            break;
        }

        let Some(mut item) = shared
            .queue
            .remove_unless(|| activation.is_cancel_requested())
        else {
            break;
        };

        if panic::catch_unwind(AssertUnwindSafe(|| shared.handler.serve(&mut item))).is_err() {
            log::error!("request handler panicked in worker [{index}]");
        }

        // closes the connection
        drop(item);
    }

    activation.retire();
    log::trace!("worker [{index}] reclaimed");
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Arc, Mutex};
    use std::thread;
    use std::time::{Duration, Instant};

    use super::{SlotState, WorkerPool};
    use crate::util::BoundedQueue;
    use crate::FnRequestHandler;

    pub(crate) fn wait_until<F: Fn() -> bool>(cond: F) {
        let now = Instant::now();
        while !cond() {
            assert!(now.elapsed() < Duration::from_secs(5), "condition timed out");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn pool_starts_initial_workers_test() {
        let queue = Arc::new(BoundedQueue::<u32>::with_capacity(4));
        let pool = WorkerPool::new(
            Arc::clone(&queue),
            Arc::new(FnRequestHandler(|_: &mut u32| {})),
            3,
            8,
        )
        .unwrap();

        assert_eq!(pool.numthread(), 3);
        assert_eq!(pool.max_workers(), 8);
        wait_until(|| pool.threads_live() == 3);

        for index in 0..3 {
            assert_eq!(pool.slot(index).unwrap().state(), SlotState::Running);
        }
        for index in 3..8 {
            assert_eq!(pool.slot(index).unwrap().state(), SlotState::Reclaimed);
        }
        assert!(pool.slot(8).is_none());

        queue.close();
        wait_until(|| pool.threads_live() == 0);
    }

    #[test]
    fn pool_clamps_sizes_test() {
        let queue = Arc::new(BoundedQueue::<u32>::with_capacity(1));
        let handler = Arc::new(FnRequestHandler(|_: &mut u32| {}));

        let pool = WorkerPool::new(Arc::clone(&queue), handler.clone(), 0, 0).unwrap();
        assert_eq!(pool.numthread(), 1);
        assert_eq!(pool.max_workers(), 1);

        let pool_2 = WorkerPool::new(Arc::clone(&queue), handler, 50, 4).unwrap();
        assert_eq!(pool_2.numthread(), 4);

        queue.close();
        wait_until(|| pool.threads_live() == 0 && pool_2.threads_live() == 0);
    }

    #[test]
    fn every_item_served_once_test() {
        let queue = Arc::new(BoundedQueue::with_capacity(4));
        let served = Arc::new(Mutex::new(Vec::new()));

        let pool = {
            let served = Arc::clone(&served);
            WorkerPool::new(
                Arc::clone(&queue),
                Arc::new(FnRequestHandler(move |n: &mut usize| {
                    served.lock().unwrap().push(*n);
                })),
                4,
                4,
            )
            .unwrap()
        };

        for n in 0..1000 {
            queue.insert(n).unwrap();
        }
        queue.close();
        wait_until(|| pool.threads_live() == 0);

        let mut served = served.lock().unwrap().clone();
        served.sort_unstable();
        assert_eq!(served, (0..1000).collect::<Vec<_>>());
    }

    #[test]
    fn shrink_reclaims_idle_workers_test() {
        let queue = Arc::new(BoundedQueue::<u32>::with_capacity(4));
        let pool = WorkerPool::new(
            Arc::clone(&queue),
            Arc::new(FnRequestHandler(|_: &mut u32| {})),
            8,
            8,
        )
        .unwrap();
        wait_until(|| pool.threads_live() == 8);

        pool.shrink_to(2);
        assert_eq!(pool.numthread(), 2);
        wait_until(|| pool.threads_live() == 2);

        for index in 2..8 {
            assert_eq!(pool.slot(index).unwrap().state(), SlotState::Reclaimed);
        }

        pool.grow_to(4).unwrap();
        assert_eq!(pool.numthread(), 4);
        wait_until(|| pool.threads_live() == 4);

        queue.close();
        wait_until(|| pool.threads_live() == 0);
    }

    #[test]
    fn shrink_waits_for_in_flight_service_test() {
        let queue = Arc::new(BoundedQueue::with_capacity(4));
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let finished = Arc::new(AtomicUsize::new(0));

        let pool = {
            let finished = Arc::clone(&finished);
            let started_tx = Mutex::new(started_tx);
            let release_rx = Mutex::new(release_rx);
            Arc::new(
                WorkerPool::new(
                    Arc::clone(&queue),
                    Arc::new(FnRequestHandler(move |_: &mut u32| {
                        let name = thread::current().name().map(str::to_owned);
                        started_tx.lock().unwrap().send(name).unwrap();
                        release_rx.lock().unwrap().recv().unwrap();
                        let _ = finished.fetch_add(1, Ordering::AcqRel);
                    })),
                    2,
                    2,
                )
                .unwrap(),
            )
        };

        queue.insert(1).unwrap();
        let serving = started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        let shrinker = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.shrink_to(1))
        };

        thread::sleep(Duration::from_millis(100));
        if serving.as_deref() == Some("worker-1") {
            // the cancelled slot is mid-service, the controller side has to wait
            assert!(!shrinker.is_finished());
        }

        release_tx.send(()).unwrap();
        shrinker.join().unwrap();
        assert_eq!(pool.numthread(), 1);

        // the in-flight item is served to completion, never abandoned
        wait_until(|| finished.load(Ordering::Acquire) == 1);
        wait_until(|| pool.threads_live() == 1);

        queue.close();
        wait_until(|| pool.threads_live() == 0);
    }
}
