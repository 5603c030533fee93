//! Numbered worker slots.
//!
//! A semaphore bounds how many jobs run at once; the free list tells each
//! running job which slot index it occupies (used for per-worker progress).

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub(crate) struct Slots {
    sem: Arc<Semaphore>,
    free: Mutex<Vec<usize>>,
}

impl Slots {
    pub(crate) fn new(count: usize) -> Arc<Self> {
        let count = count.max(1);
        Arc::new(Self {
            sem: Arc::new(Semaphore::new(count)),
            free: Mutex::new((0..count).rev().collect()),
        })
    }

    /// Waits for a free slot. `None` once the semaphore is closed.
    pub(crate) async fn acquire(self: &Arc<Self>) -> Option<SlotGuard> {
        let permit = Arc::clone(&self.sem).acquire_owned().await.ok()?;
        let index = self
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()?;
        Some(SlotGuard {
            index,
            slots: Arc::clone(self),
            _permit: permit,
        })
    }

    pub(crate) fn close(&self) {
        self.sem.close();
    }
}

/// Occupied slot; released on drop.
pub(crate) struct SlotGuard {
    index: usize,
    slots: Arc<Slots>,
    _permit: OwnedSemaphorePermit,
}

impl SlotGuard {
    pub(crate) fn index(&self) -> usize {
        self.index
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        // index goes back before the permit is released (fields drop after this body)
        self.slots
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(self.index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hands_out_distinct_indices_and_recycles_them() {
        let slots = Slots::new(2);
        let a = slots.acquire().await.expect("slot a");
        let b = slots.acquire().await.expect("slot b");
        assert_ne!(a.index(), b.index());
        assert!(slots.sem.try_acquire().is_err());

        let freed = a.index();
        drop(a);
        let c = slots.acquire().await.expect("slot c");
        assert_eq!(c.index(), freed);
    }

    #[tokio::test]
    async fn closed_slots_refuse_acquire() {
        let slots = Slots::new(1);
        slots.close();
        assert!(slots.acquire().await.is_none());
    }
}
