//! Fixed-capacity pool of worker slots.
//!
//! Every accepted connection must claim a slot before it is served. Claims
//! never wait: when all slots are busy the caller drops the connection.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

#[derive(Debug, Clone)]
pub struct WorkerPool {
    slots: Arc<[AtomicBool]>,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        Self {
            slots: (0..size).map(|_| AtomicBool::new(false)).collect(),
        }
    }

    /// Claims a free slot, or returns `None` if every slot is in use.
    ///
    /// Each slot is claimed with a compare-and-swap, so listeners sharing the
    /// pool never hand out the same slot twice.
    pub fn try_acquire(&self) -> Option<SlotHandle> {
        let index = self.slots.iter().position(|slot| {
            slot.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        })?;
        debug!(slot = index, "slot claimed");
        Some(SlotHandle {
            slots: Arc::clone(&self.slots),
            index,
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn in_use(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.load(Ordering::Acquire))
            .count()
    }
}

/// A claimed slot. Released when dropped.
#[derive(Debug)]
pub struct SlotHandle {
    slots: Arc<[AtomicBool]>,
    index: usize,
}

impl SlotHandle {
    pub fn index(&self) -> usize {
        self.index
    }
}

impl Drop for SlotHandle {
    fn drop(&mut self) {
        self.slots[self.index].store(false, Ordering::Release);
        debug!(slot = self.index, "slot released");
    }
}
