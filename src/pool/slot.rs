use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Lifecycle of a [`WorkerSlot`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotState {
    /// A worker thread is servicing the slot
    Running,
    /// Cancellation was requested, the worker has not reached its safe point yet
    CancelRequested,
    /// No worker thread is servicing the slot
    Reclaimed,
}

impl SlotState {
    const RUNNING: u8 = 0;
    const CANCEL_REQUESTED: u8 = 1;
    const RECLAIMED: u8 = 2;

    fn from_u8(v: u8) -> Self {
        match v {
            Self::RUNNING => Self::Running,
            Self::CANCEL_REQUESTED => Self::CancelRequested,
            _ => Self::Reclaimed,
        }
    }
}

/// One thread of control attached to a slot.
///
/// Every activation of a slot gets a fresh `Activation`, so a late worker of a
/// previous activation can never pick up the state of the next one.
#[derive(Debug)]
pub(crate) struct Activation {
    state: AtomicU8,
}

impl Activation {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(SlotState::RUNNING),
        }
    }

    #[inline]
    pub(crate) fn is_cancel_requested(&self) -> bool {
        self.state.load(Ordering::Acquire) != SlotState::RUNNING
    }

    fn request_cancel(&self) -> bool {
        self.state
            .compare_exchange(
                SlotState::RUNNING,
                SlotState::CANCEL_REQUESTED,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Called by the worker thread on its way out.
    pub(crate) fn retire(&self) {
        self.state.store(SlotState::RECLAIMED, Ordering::Release);
    }

    fn state(&self) -> SlotState {
        SlotState::from_u8(self.state.load(Ordering::Acquire))
    }
}

/// Addressable unit of the worker pool.
///
/// The `active` lock is held by the slot's worker for a whole service iteration,
/// including the blocking removal from the queue. The pool controller takes it only
/// to wait until a cancelled worker is out of service.
#[derive(Debug)]
pub struct WorkerSlot {
    index: usize,
    active: Mutex<()>,
    current: Mutex<Option<Arc<Activation>>>,
}

impl WorkerSlot {
    pub(crate) fn new(index: usize) -> Self {
        Self {
            index,
            active: Mutex::new(()),
            current: Mutex::new(None),
        }
    }

    /// Stable index of the slot in the pool.
    #[must_use]
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Lifecycle state of the current activation.
    #[must_use]
    pub fn state(&self) -> SlotState {
        self.current()
            .as_ref()
            .map_or(SlotState::Reclaimed, |activation| activation.state())
    }

    /// Starts a new activation and makes it the current one.
    pub(crate) fn activate(&self) -> Arc<Activation> {
        let activation = Arc::new(Activation::new());
        *self.current() = Some(Arc::clone(&activation));
        activation
    }

    /// Flags the current activation for cancellation.
    ///
    /// Returns `false` if there was no running activation.
    pub(crate) fn request_cancel(&self) -> bool {
        self.current()
            .as_ref()
            .is_some_and(|activation| activation.request_cancel())
    }

    /// Acquires the slot's exclusive service lock.
    #[inline]
    pub(crate) fn lock(&self) -> MutexGuard<'_, ()> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current(&self) -> MutexGuard<'_, Option<Arc<Activation>>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
