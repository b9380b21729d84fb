use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts a live worker thread for as long as it is held.
///
/// Adds 1 on creation and subtracts 1 on drop, so the count stays correct even if
/// the thread unwinds.
pub(crate) struct Registration<'a> {
    nb: &'a AtomicUsize,
}

impl<'a> Registration<'a> {
    pub(crate) fn new(nb: &'a AtomicUsize) -> Self {
        let _ = nb.fetch_add(1, Ordering::AcqRel);
        Self { nb }
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        let _ = self.nb.fetch_sub(1, Ordering::AcqRel);
    }
}
