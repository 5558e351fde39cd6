//! Dependencies and the chain stack.
//!
//! A dependency records that a thread acquired a lock while already holding
//! a set of others. The detectors assemble dependencies from different
//! threads into chains; a chain that closes on itself is a deadlock
//! candidate.

use crate::core::locks::LockMeta;
use crate::core::types::{LockId, RoutineIndex};
use std::fmt;
use std::sync::Arc;

/// One entry of a holding set: the lock and whether it was held as a
/// reader at the time.
#[derive(Clone)]
pub(crate) struct Held {
    pub lock: Arc<LockMeta>,
    pub read: bool,
}

impl Held {
    pub fn id(&self) -> LockId {
        self.lock.id()
    }
}

/// ⟨acquired lock, holding set⟩ as recorded by one thread.
///
/// `read` is true when the acquisition itself was a shared (reader)
/// acquisition of an rw-lock; the holding entries carry the same flag for
/// the locks that were already held. Two dependencies are considered equal
/// when they name the same lock and the same ordered holding-set prefix —
/// lock identity only, hold modes do not participate.
#[derive(Clone)]
pub(crate) struct Dependency {
    pub lock: Arc<LockMeta>,
    pub read: bool,
    pub holding: Vec<Held>,
}

impl Dependency {
    pub fn new(lock: Arc<LockMeta>, read: bool, holding: &[Held]) -> Self {
        Dependency {
            lock,
            read,
            holding: holding.to_vec(),
        }
    }

    pub fn lock_id(&self) -> LockId {
        self.lock.id()
    }

    /// Exact equality against a candidate ⟨lock, holding prefix⟩.
    pub fn matches(&self, lock: &LockMeta, holding: &[Held]) -> bool {
        self.lock.id() == lock.id()
            && self.holding.len() == holding.len()
            && self
                .holding
                .iter()
                .zip(holding)
                .all(|(a, b)| a.id() == b.id())
    }

    /// Lock-id sequence identifying the dependency's shape, used by the
    /// comprehensive detector to count distinct dependencies globally.
    pub fn shape(&self) -> Vec<LockId> {
        let mut shape = Vec::with_capacity(self.holding.len() + 1);
        shape.push(self.lock.id());
        shape.extend(self.holding.iter().map(Held::id));
        shape
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependency")
            .field("lock", &self.lock.id())
            .field("read", &self.read)
            .field("holding", &self.holding.iter().map(Held::id).collect::<Vec<_>>())
            .finish()
    }
}

/// Combining key partitioning a thread's dependency map. A hash hint only;
/// entries sharing a key are confirmed with [`Dependency::matches`].
pub(crate) fn dependency_key(lock: &LockMeta, innermost: &LockMeta) -> usize {
    lock.id() ^ innermost.id()
}

/// A dependency together with its origin, so chain membership checks can
/// compare identities rather than values.
#[derive(Clone, Debug)]
pub(crate) struct DepRef {
    pub routine: RoutineIndex,
    pub slot: usize,
    pub dep: Dependency,
}

impl DepRef {
    pub fn same_entry(&self, other: &DepRef) -> bool {
        self.routine == other.routine && self.slot == other.slot
    }
}

/// Stack of dependencies representing the chain being explored.
#[derive(Default)]
pub(crate) struct DepStack {
    entries: Vec<DepRef>,
}

impl DepStack {
    pub fn new() -> Self {
        DepStack::default()
    }

    pub fn push(&mut self, entry: DepRef) {
        self.entries.push(entry);
    }

    pub fn pop(&mut self) {
        self.entries.pop();
    }

    /// The first dependency pushed (the chain's origin).
    pub fn bottom(&self) -> Option<&DepRef> {
        self.entries.first()
    }

    /// The most recently pushed dependency.
    pub fn top(&self) -> Option<&DepRef> {
        self.entries.last()
    }

    pub fn entries(&self) -> &[DepRef] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::locks::LockMeta;
    use crate::core::types::LockKind;

    fn lock() -> Arc<LockMeta> {
        LockMeta::new_for_tests(LockKind::Exclusive)
    }

    fn held(lock: &Arc<LockMeta>) -> Held {
        Held {
            lock: Arc::clone(lock),
            read: false,
        }
    }

    #[test]
    fn matches_compares_lock_and_ordered_prefix() {
        let (a, b, c) = (lock(), lock(), lock());
        let dep = Dependency::new(Arc::clone(&c), false, &[held(&a), held(&b)]);

        assert!(dep.matches(&c, &[held(&a), held(&b)]));
        assert!(!dep.matches(&c, &[held(&b), held(&a)]), "order matters");
        assert!(!dep.matches(&c, &[held(&a)]), "length matters");
        assert!(!dep.matches(&a, &[held(&a), held(&b)]));
    }

    #[test]
    fn key_is_symmetric_in_the_pair() {
        let (a, b) = (lock(), lock());
        assert_eq!(dependency_key(&a, &b), dependency_key(&b, &a));
    }

    #[test]
    fn stack_tracks_bottom_and_top() {
        let (a, b, c) = (lock(), lock(), lock());
        let mut stack = DepStack::new();
        assert!(stack.bottom().is_none());

        let first = DepRef {
            routine: 0,
            slot: 0,
            dep: Dependency::new(Arc::clone(&b), false, &[held(&a)]),
        };
        let second = DepRef {
            routine: 1,
            slot: 0,
            dep: Dependency::new(Arc::clone(&c), false, &[held(&b)]),
        };
        stack.push(first.clone());
        stack.push(second.clone());

        assert!(stack.bottom().is_some_and(|e| e.same_entry(&first)));
        assert!(stack.top().is_some_and(|e| e.same_entry(&second)));

        stack.pop();
        assert!(stack.top().is_some_and(|e| e.same_entry(&first)));
    }
}
