//! Reference table for host objects referenced from script
//!
//! Maps the [`ReferenceId`] stored in a proxy's private slot to the host
//! instance it stands for. The table holds a strong reference per live
//! entry, so a host object stays alive while any proxy points at it.
//!
//! Slots are reused only with a bumped generation: an id that outlives its
//! entry fails with [`ReferenceError::Stale`] instead of resolving to an
//! unrelated object.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tether_sdk::ReferenceId;
use tracing::trace;

use crate::error::ReferenceError;
use crate::host::HostObject;

/// Hook run when the last entry of a host instance is released
pub type DisposeHook = Arc<dyn Fn(&HostObject) + Send + Sync>;

#[derive(Debug)]
struct Slot {
    generation: u32,
    object: Option<HostObject>,
}

#[derive(Debug, Default)]
struct Entries {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
    /// Live entries per host instance address
    instances: FxHashMap<usize, usize>,
}

impl Entries {
    fn lookup(&self, id: ReferenceId) -> Result<&HostObject, ReferenceError> {
        let slot = self
            .slots
            .get(id.index() as usize)
            .ok_or(ReferenceError::Unknown(id))?;
        if slot.generation != id.generation() {
            return Err(if slot.generation > id.generation() {
                ReferenceError::Stale(id)
            } else {
                ReferenceError::Unknown(id)
            });
        }
        slot.object.as_ref().ok_or(ReferenceError::Unknown(id))
    }
}

/// Thread-safe table of host objects referenced by script proxies
pub struct ReferenceTable {
    entries: Mutex<Entries>,
    dispose: Option<DisposeHook>,
}

impl ReferenceTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
            dispose: None,
        }
    }

    /// Create an empty table that runs `hook` when the last entry of a host
    /// instance is released
    pub fn with_dispose(hook: DisposeHook) -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
            dispose: Some(hook),
        }
    }

    /// Store a strong reference and return its id
    pub fn alloc(&self, object: HostObject) -> ReferenceId {
        let mut entries = self.entries.lock();
        *entries.instances.entry(object.address()).or_insert(0) += 1;
        entries.live += 1;

        let reused = entries.free.pop();
        let id = match reused {
            Some(index) => {
                let slot = &mut entries.slots[index as usize];
                slot.object = Some(object);
                ReferenceId::new(index, slot.generation)
            }
            None => {
                let index = entries.slots.len() as u32;
                entries.slots.push(Slot {
                    generation: 1,
                    object: Some(object),
                });
                ReferenceId::new(index, 1)
            }
        };
        trace!(id = %id, live = entries.live, "reference allocated");
        id
    }

    /// Release an entry. Fails if the id is unknown or already released.
    pub fn dealloc(&self, id: ReferenceId) -> Result<HostObject, ReferenceError> {
        self.release(id, true)
    }

    /// Release an entry without running the dispose hook
    pub(crate) fn revoke(&self, id: ReferenceId) -> Result<HostObject, ReferenceError> {
        self.release(id, false)
    }

    fn release(&self, id: ReferenceId, dispose: bool) -> Result<HostObject, ReferenceError> {
        let (object, last) = {
            let mut entries = self.entries.lock();
            entries.lookup(id)?;

            let slot = &mut entries.slots[id.index() as usize];
            let Some(object) = slot.object.take() else {
                return Err(ReferenceError::Unknown(id));
            };
            slot.generation = slot.generation.wrapping_add(1).max(1);
            entries.free.push(id.index());
            entries.live -= 1;

            let address = object.address();
            let last = match entries.instances.get_mut(&address) {
                Some(count) if *count > 1 => {
                    *count -= 1;
                    false
                }
                _ => {
                    entries.instances.remove(&address);
                    true
                }
            };
            trace!(id = %id, live = entries.live, last, "reference released");
            (object, last)
        };

        if dispose && last {
            if let Some(hook) = &self.dispose {
                hook(&object);
            }
        }
        Ok(object)
    }

    /// Resolve an id to its host object
    pub fn get(&self, id: ReferenceId) -> Result<HostObject, ReferenceError> {
        self.entries.lock().lookup(id).cloned()
    }

    /// Whether `id` is live
    pub fn contains(&self, id: ReferenceId) -> bool {
        self.entries.lock().lookup(id).is_ok()
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries.lock().live
    }

    /// Whether no entry is live
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of live entries pointing at `object`
    pub fn count_of(&self, object: &HostObject) -> usize {
        self.entries
            .lock()
            .instances
            .get(&object.address())
            .copied()
            .unwrap_or(0)
    }
}

impl Default for ReferenceTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_reference_table() {
        let table = ReferenceTable::new();
        assert!(table.is_empty());

        let a = HostObject::new(42u32);
        let b = HostObject::new(true);
        let id_a = table.alloc(a.clone());
        let id_b = table.alloc(b.clone());

        assert_eq!(table.len(), 2);
        assert_ne!(id_a, id_b);
        assert!(table.get(id_a).unwrap().ptr_eq(&a));
        assert!(table.get(id_b).unwrap().ptr_eq(&b));

        assert!(table.dealloc(id_a).unwrap().ptr_eq(&a));
        assert_eq!(table.len(), 1);
        assert!(!table.contains(id_a));
        assert_eq!(table.get(id_a).unwrap_err(), ReferenceError::Stale(id_a));
        assert_eq!(table.dealloc(id_a).unwrap_err(), ReferenceError::Stale(id_a));
    }

    #[test]
    fn test_unknown_ids() {
        let table = ReferenceTable::new();
        let id = ReferenceId::new(9, 1);
        assert_eq!(table.get(id).unwrap_err(), ReferenceError::Unknown(id));

        let live = table.alloc(HostObject::new(()));
        let future = ReferenceId::new(live.index(), live.generation() + 1);
        assert_eq!(table.get(future).unwrap_err(), ReferenceError::Unknown(future));
    }

    #[test]
    fn test_slot_reuse_bumps_generation() {
        let table = ReferenceTable::new();
        let first = table.alloc(HostObject::new(1u8));
        table.dealloc(first).unwrap();

        let second = table.alloc(HostObject::new(2u8));
        assert_eq!(second.index(), first.index());
        assert_eq!(second.generation(), first.generation() + 1);
        assert_eq!(table.get(first).unwrap_err(), ReferenceError::Stale(first));
        assert_eq!(table.get(second).unwrap().downcast_ref::<u8>(), Some(&2));
    }

    #[test]
    fn test_table_keeps_object_alive() {
        let table = ReferenceTable::new();
        let object = HostObject::new(String::from("kept"));
        let id = table.alloc(object.clone());
        assert_eq!(object.strong_count(), 2);

        table.dealloc(id).unwrap();
        assert_eq!(object.strong_count(), 1);
    }

    #[test]
    fn test_dispose_runs_on_last_release() {
        let disposed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&disposed);
        let table = ReferenceTable::with_dispose(Arc::new(move |_: &HostObject| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let object = HostObject::new(5i64);
        let first = table.alloc(object.clone());
        let second = table.alloc(object.clone());
        assert_eq!(table.count_of(&object), 2);

        table.dealloc(first).unwrap();
        assert_eq!(disposed.load(Ordering::SeqCst), 0);
        table.dealloc(second).unwrap();
        assert_eq!(disposed.load(Ordering::SeqCst), 1);
        assert_eq!(table.count_of(&object), 0);

        let third = table.alloc(object);
        table.revoke(third).unwrap();
        assert_eq!(disposed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_access() {
        let table = Arc::new(ReferenceTable::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let table = Arc::clone(&table);
                std::thread::spawn(move || {
                    let ids: Vec<_> = (0..100).map(|i| table.alloc(HostObject::new(t * 1000 + i))).collect();
                    for id in ids {
                        table.dealloc(id).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(table.is_empty());
    }
}
