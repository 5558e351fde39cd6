use crate::core::caller::CallerInfo;
use crate::core::types::{LockId, LockKind, RoutineIndex};
use fxhash::FxHashMap;
use parking_lot::Mutex;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// How a registered thread currently holds a lock.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Holder {
    /// Outstanding acquisitions by this thread (readers of an rw-lock may
    /// hold more than one).
    pub count: usize,
    /// Whether the thread's most recent acquisition was a shared read.
    pub read: bool,
}

/// Detector-side identity of a lock.
///
/// Every tracked `Mutex`/`RwLock` owns one of these; dependencies keep it
/// alive through `Arc` after the wrapper is gone, so a lock id observed in
/// a report can always be resolved back to its context log. Equality and
/// hashing use the id alone.
pub(crate) struct LockMeta {
    id: LockId,
    kind: LockKind,
    /// Number of currently outstanding acquisitions.
    locked: AtomicUsize,
    /// Which registered threads hold the lock, and how.
    holders: Mutex<FxHashMap<RoutineIndex, Holder>>,
    /// Creation site first, acquisition sites after, append-only.
    context: Mutex<Vec<CallerInfo>>,
}

impl LockMeta {
    pub fn new(kind: LockKind, creation: CallerInfo) -> Arc<Self> {
        Arc::new(LockMeta {
            id: super::next_lock_id(),
            kind,
            locked: AtomicUsize::new(0),
            holders: Mutex::new(FxHashMap::default()),
            context: Mutex::new(vec![creation]),
        })
    }

    pub fn id(&self) -> LockId {
        self.id
    }

    pub fn kind(&self) -> LockKind {
        self.kind
    }

    pub fn locked_count(&self) -> usize {
        self.locked.load(Ordering::SeqCst)
    }

    /// How `routine` currently holds this lock, if at all.
    pub fn holder(&self, routine: RoutineIndex) -> Option<Holder> {
        self.holders.lock().get(&routine).copied()
    }

    /// Note that `routine` is taking the lock (called before the primitive
    /// acquisition, so the detector sees the intent to hold).
    pub fn note_acquired(&self, routine: RoutineIndex, read: bool) {
        let mut holders = self.holders.lock();
        let entry = holders.entry(routine).or_insert(Holder { count: 0, read });
        entry.count += 1;
        entry.read = read;
    }

    /// Note that `routine` released the lock once; the entry disappears
    /// when its count reaches zero.
    pub fn note_released(&self, routine: RoutineIndex) {
        let mut holders = self.holders.lock();
        if let Some(entry) = holders.get_mut(&routine) {
            entry.count -= 1;
            if entry.count == 0 {
                holders.remove(&routine);
            }
        }
    }

    pub fn increment_locked(&self) {
        self.locked.fetch_add(1, Ordering::SeqCst);
    }

    pub fn decrement_locked(&self) {
        if self.locked.load(Ordering::SeqCst) == 0 {
            panic!("tried to unlock lock {} which was not locked", self.id);
        }
        self.locked.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn push_context(&self, info: CallerInfo) {
        self.context.lock().push(info);
    }

    /// Snapshot of the context log, creation site first.
    pub fn context_log(&self) -> Vec<CallerInfo> {
        self.context.lock().clone()
    }

    #[cfg(test)]
    pub fn new_for_tests(kind: LockKind) -> Arc<Self> {
        LockMeta::new(
            kind,
            CallerInfo::creation(std::panic::Location::caller()),
        )
    }
}

impl PartialEq for LockMeta {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for LockMeta {}

impl Hash for LockMeta {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_stable() {
        let a = LockMeta::new_for_tests(LockKind::Exclusive);
        let b = LockMeta::new_for_tests(LockKind::Exclusive);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.id(), a.id());
    }

    #[test]
    fn holder_map_counts_reader_reentry() {
        let lock = LockMeta::new_for_tests(LockKind::ReaderWriter);
        lock.note_acquired(3, true);
        lock.note_acquired(3, true);

        let holder = lock.holder(3).unwrap();
        assert_eq!(holder.count, 2);
        assert!(holder.read);

        lock.note_released(3);
        assert_eq!(lock.holder(3).unwrap().count, 1);
        lock.note_released(3);
        assert!(lock.holder(3).is_none());
    }

    #[test]
    fn context_log_starts_with_creation() {
        let lock = LockMeta::new_for_tests(LockKind::Exclusive);
        lock.push_context(CallerInfo::acquisition(
            std::panic::Location::caller(),
            None,
        ));

        let log = lock.context_log();
        assert_eq!(log.len(), 2);
        assert!(log[0].is_creation());
        assert!(!log[1].is_creation());
    }

    #[test]
    #[should_panic(expected = "was not locked")]
    fn releasing_an_unlocked_lock_panics() {
        let lock = LockMeta::new_for_tests(LockKind::Exclusive);
        lock.decrement_locked();
    }
}
