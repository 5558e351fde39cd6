//! Chain and cycle predicates shared by both detectors.
//!
//! A chain is a sequence of dependencies from distinct threads where each
//! dependency's holding set contains the previous dependency's acquired
//! lock, and the holding sets are otherwise pairwise disjoint. A chain
//! whose first holding set contains the last acquired lock closes into a
//! cycle: each thread holds what the next one wants.
//!
//! The disjointness requirement is the guard-lock filter: if two threads
//! both held some lock `g` while taking the conflicting pair, `g`
//! serialises them and the inversion cannot deadlock. Two shared reader
//! holds of the same rw-lock do not serialise anything, so that single
//! case is exempt.

use crate::core::dependency::{DepRef, DepStack, Dependency};

/// Would pushing `cand` onto `stack` still form a chain?
pub(crate) fn is_chain(stack: &DepStack, cand: &DepRef) -> bool {
    for entry in stack.entries() {
        if entry.same_entry(cand) {
            return false;
        }
        if entry.dep.lock_id() == cand.dep.lock_id() {
            return false;
        }
        for held in &entry.dep.holding {
            for other in &cand.dep.holding {
                if held.id() == other.id() && !(held.read && other.read) {
                    return false;
                }
            }
        }
    }
    // The candidate must wait on the chain's current tip.
    match stack.top() {
        Some(top) => cand
            .dep
            .holding
            .iter()
            .any(|held| held.id() == top.dep.lock_id()),
        None => false,
    }
}

/// Would pushing `cand` close `stack` into a deadlocking cycle?
pub(crate) fn is_cycle_chain(stack: &DepStack, cand: &DepRef) -> bool {
    let Some(bottom) = stack.bottom() else {
        return false;
    };
    if !bottom
        .dep
        .holding
        .iter()
        .any(|held| held.id() == cand.dep.lock_id())
    {
        return false;
    }
    check_rw_cycle(stack, cand)
}

/// Reject cycles rendered harmless by reader semantics: an edge where the
/// acquired lock is taken as a reader and the successor also holds it as a
/// reader is no conflict at all, and one conflict-free edge breaks the
/// whole cycle.
pub(crate) fn check_rw_cycle(stack: &DepStack, cand: &DepRef) -> bool {
    let len = stack.entries().len() + 1;
    let dep_at = |i: usize| -> &Dependency {
        if i < stack.entries().len() {
            &stack.entries()[i].dep
        } else {
            &cand.dep
        }
    };

    for i in 0..len {
        let dep = dep_at(i);
        if !dep.read {
            continue;
        }
        let successor = dep_at((i + 1) % len);
        if let Some(held) = successor
            .holding
            .iter()
            .find(|held| held.id() == dep.lock_id())
            && held.read
        {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dependency::{DepStack, Dependency, Held};
    use crate::core::locks::LockMeta;
    use crate::core::types::LockKind;
    use std::sync::Arc;

    fn lock() -> Arc<LockMeta> {
        LockMeta::new_for_tests(LockKind::Exclusive)
    }

    fn rwlock() -> Arc<LockMeta> {
        LockMeta::new_for_tests(LockKind::ReaderWriter)
    }

    fn held(lock: &Arc<LockMeta>) -> Held {
        Held {
            lock: Arc::clone(lock),
            read: false,
        }
    }

    fn rheld(lock: &Arc<LockMeta>) -> Held {
        Held {
            lock: Arc::clone(lock),
            read: true,
        }
    }

    fn dep_ref(routine: usize, lock: &Arc<LockMeta>, holding: Vec<Held>) -> DepRef {
        DepRef {
            routine,
            slot: 0,
            dep: Dependency {
                lock: Arc::clone(lock),
                read: false,
                holding,
            },
        }
    }

    fn rdep_ref(routine: usize, lock: &Arc<LockMeta>, holding: Vec<Held>) -> DepRef {
        DepRef {
            routine,
            slot: 0,
            dep: Dependency {
                lock: Arc::clone(lock),
                read: true,
                holding,
            },
        }
    }

    fn stack_of(entries: Vec<DepRef>) -> DepStack {
        let mut stack = DepStack::new();
        for entry in entries {
            stack.push(entry);
        }
        stack
    }

    #[test]
    fn inverse_pair_forms_a_cycle() {
        let (x, y) = (lock(), lock());
        let stack = stack_of(vec![dep_ref(0, &y, vec![held(&x)])]);
        let cand = dep_ref(1, &x, vec![held(&y)]);

        assert!(is_chain(&stack, &cand));
        assert!(is_cycle_chain(&stack, &cand));
    }

    #[test]
    fn same_acquired_lock_is_rejected() {
        let (x, y) = (lock(), lock());
        let stack = stack_of(vec![dep_ref(0, &y, vec![held(&x)])]);
        let cand = dep_ref(1, &y, vec![held(&x)]);

        assert!(!is_chain(&stack, &cand));
    }

    #[test]
    fn shared_guard_lock_breaks_the_chain() {
        let (g, x, y) = (lock(), lock(), lock());
        let stack = stack_of(vec![dep_ref(0, &y, vec![held(&g), held(&x)])]);
        let cand = dep_ref(1, &x, vec![held(&g), held(&y)]);

        assert!(!is_chain(&stack, &cand));
    }

    #[test]
    fn shared_reader_hold_is_not_a_guard() {
        let (g, x, y) = (rwlock(), lock(), lock());
        let stack = stack_of(vec![dep_ref(0, &y, vec![rheld(&g), held(&x)])]);
        let cand = dep_ref(1, &x, vec![rheld(&g), held(&y)]);

        assert!(is_chain(&stack, &cand));
        assert!(is_cycle_chain(&stack, &cand));
    }

    #[test]
    fn candidate_must_wait_on_the_chain_tip() {
        let (x, y, z, w) = (lock(), lock(), lock(), lock());
        let stack = stack_of(vec![dep_ref(0, &y, vec![held(&x)])]);
        // Holds w, not y: unrelated to the tip.
        let cand = dep_ref(1, &z, vec![held(&w)]);

        assert!(!is_chain(&stack, &cand));
    }

    #[test]
    fn three_edge_cycle_closes_on_the_bottom() {
        let (x, y, z) = (lock(), lock(), lock());
        let stack = stack_of(vec![
            dep_ref(0, &y, vec![held(&x)]),
            dep_ref(1, &z, vec![held(&y)]),
        ]);
        let cand = dep_ref(2, &x, vec![held(&z)]);

        assert!(is_chain(&stack, &cand));
        assert!(is_cycle_chain(&stack, &cand));
    }

    #[test]
    fn reader_on_reader_cycle_is_filtered() {
        let (a, b) = (rwlock(), rwlock());
        // Both threads read-hold one lock and read-acquire the other.
        let stack = stack_of(vec![rdep_ref(0, &b, vec![rheld(&a)])]);
        let cand = rdep_ref(1, &a, vec![rheld(&b)]);

        assert!(is_chain(&stack, &cand));
        assert!(!check_rw_cycle(&stack, &cand));
        assert!(!is_cycle_chain(&stack, &cand));
    }

    #[test]
    fn writer_involvement_keeps_the_cycle() {
        let (a, b) = (rwlock(), rwlock());
        // Each thread read-acquires the lock the other write-holds: every
        // edge meets a writer, so the cycle stands.
        let stack = stack_of(vec![rdep_ref(0, &b, vec![held(&a)])]);
        let cand = rdep_ref(1, &a, vec![held(&b)]);

        assert!(is_chain(&stack, &cand));
        assert!(is_cycle_chain(&stack, &cand));
    }

    #[test]
    fn read_acquisition_of_a_read_held_lock_defuses_the_cycle() {
        let (a, b) = (rwlock(), rwlock());
        // Thread 1 read-acquires a, which thread 0 only read-holds:
        // readers share, that edge never blocks.
        let stack = stack_of(vec![dep_ref(0, &b, vec![rheld(&a)])]);
        let cand = rdep_ref(1, &a, vec![held(&b)]);

        assert!(is_chain(&stack, &cand));
        assert!(!is_cycle_chain(&stack, &cand));
    }
}
