//! Cross-thread release queue
//!
//! The engine may finalize proxies on any thread. Finalizers only push the
//! proxy's id here; the owning bridge drains the queue on its own thread and
//! releases the reference table entries.

use crossbeam::channel::{self, Receiver, Sender};
use tether_sdk::ReferenceId;

/// Queue of references whose proxies were finalized
#[derive(Debug)]
pub struct ReleaseQueue {
    tx: Sender<ReferenceId>,
    rx: Receiver<ReferenceId>,
}

impl ReleaseQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        let (tx, rx) = channel::unbounded();
        Self { tx, rx }
    }

    /// Enqueue a finalized reference. Safe from any thread.
    pub fn push(&self, id: ReferenceId) {
        // The receiver lives as long as `self`, so sending cannot fail.
        let _ = self.tx.send(id);
    }

    /// A sender usable from another thread
    pub fn sender(&self) -> Sender<ReferenceId> {
        self.tx.clone()
    }

    /// Take every queued reference
    pub fn drain(&self) -> Vec<ReferenceId> {
        self.rx.try_iter().collect()
    }

    /// Number of queued references
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for ReleaseQueue {
    fn default() -> Self {
        Self::new()
    }
}
