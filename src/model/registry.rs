use std::sync::Arc;

use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};
use tracing::{debug, trace};

use crate::common::collections::HashMap;
use crate::model::virtual_space::VirtualSpace;
use crate::sys::screen::SpaceId;

/// Exclusive access to one virtual space. The lock is released on drop.
pub type SpaceGuard = ArcMutexGuard<RawMutex, VirtualSpace>;

/// Lazily populated map of every virtual space seen so far.
///
/// The registry lock is only held while looking up or inserting an entry,
/// never while waiting for a space lock.
#[derive(Default)]
pub struct SpaceRegistry {
    spaces: Mutex<HashMap<SpaceId, Arc<Mutex<VirtualSpace>>>>,
}

impl SpaceRegistry {
    pub fn new() -> Self { Self::default() }

    fn entry(&self, id: SpaceId, create: impl FnOnce() -> VirtualSpace) -> Arc<Mutex<VirtualSpace>> {
        let mut spaces = self.spaces.lock();
        spaces
            .entry(id)
            .or_insert_with(|| {
                debug!(space = %id, "registering virtual space");
                Arc::new(Mutex::new(create()))
            })
            .clone()
    }

    /// Locks the space, creating it with `create` on first access.
    pub fn acquire(&self, id: SpaceId, create: impl FnOnce() -> VirtualSpace) -> SpaceGuard {
        let space = self.entry(id, create);
        trace!(space = %id, "acquiring space");
        space.lock_arc()
    }

    /// Locks an existing space.
    pub fn get(&self, id: SpaceId) -> Option<SpaceGuard> {
        let space = self.spaces.lock().get(&id).cloned()?;
        Some(space.lock_arc())
    }

    /// Locks two distinct spaces. Locks are always taken in ascending id
    /// order; the guards are returned in argument order.
    pub fn acquire_pair(
        &self,
        a: SpaceId,
        create_a: impl FnOnce() -> VirtualSpace,
        b: SpaceId,
        create_b: impl FnOnce() -> VirtualSpace,
    ) -> (SpaceGuard, SpaceGuard) {
        debug_assert_ne!(a, b, "acquire_pair needs two distinct spaces");
        let space_a = self.entry(a, create_a);
        let space_b = self.entry(b, create_b);
        if a < b {
            let ga = space_a.lock_arc();
            let gb = space_b.lock_arc();
            (ga, gb)
        } else {
            let gb = space_b.lock_arc();
            let ga = space_a.lock_arc();
            (ga, gb)
        }
    }

    pub fn release(&self, guard: SpaceGuard) { drop(guard) }

    pub fn contains(&self, id: SpaceId) -> bool { self.spaces.lock().contains_key(&id) }

    pub fn ids(&self) -> Vec<SpaceId> {
        let mut ids: Vec<_> = self.spaces.lock().keys().copied().collect();
        ids.sort();
        ids
    }

    /// Drops every space. Outstanding guards keep their space alive until
    /// released.
    pub fn teardown(&self) {
        let drained = std::mem::take(&mut *self.spaces.lock());
        debug!(count = drained.len(), "tearing down virtual spaces");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;
    use crate::model::virtual_space::tests::{display, insets};
    use crate::model::virtual_space::SpaceConfig;
    use crate::sys::screen::{DisplayId, SpaceInfo};

    fn make(id: u64) -> impl FnOnce() -> VirtualSpace {
        move || {
            let info = SpaceInfo {
                id: SpaceId::new(id),
                display: DisplayId(1),
                desktop_index: id as usize,
            };
            VirtualSpace::new(info, display(), insets(), SpaceConfig::default())
        }
    }

    #[test]
    fn creates_once() {
        let registry = SpaceRegistry::new();
        let created = AtomicUsize::new(0);
        for _ in 0..3 {
            let guard = registry.acquire(SpaceId::new(4), || {
                created.fetch_add(1, Ordering::SeqCst);
                make(4)()
            });
            assert_eq!(guard.desktop_index, 4);
            registry.release(guard);
        }
        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert!(registry.get(SpaceId::new(5)).is_none());
        assert_eq!(registry.ids(), vec![SpaceId::new(4)]);
    }

    #[test]
    fn guard_serializes_mutation() {
        let registry = Arc::new(SpaceRegistry::new());
        drop(registry.acquire(SpaceId::new(1), make(1)));
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        let mut guard = registry.get(SpaceId::new(1)).unwrap();
                        guard.gap += 1.0;
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(registry.get(SpaceId::new(1)).unwrap().gap, 800.0);
    }

    #[test]
    fn opposite_pair_orders_do_not_deadlock() {
        let registry = Arc::new(SpaceRegistry::new());
        let barrier = Arc::new(Barrier::new(2));
        let spawn = |a: u64, b: u64| {
            let registry = registry.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..500 {
                    let (ga, gb) =
                        registry.acquire_pair(SpaceId::new(a), make(a), SpaceId::new(b), make(b));
                    assert_eq!(ga.id, SpaceId::new(a));
                    assert_eq!(gb.id, SpaceId::new(b));
                }
            })
        };
        let t1 = spawn(1, 2);
        let t2 = spawn(2, 1);
        t1.join().unwrap();
        t2.join().unwrap();
    }

    #[test]
    fn teardown_drops_spaces() {
        let registry = SpaceRegistry::new();
        let guard = registry.acquire(SpaceId::new(3), make(3));
        registry.teardown();
        assert!(!registry.contains(SpaceId::new(3)));
        assert_eq!(guard.id, SpaceId::new(3));
    }
}
