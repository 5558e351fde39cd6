//! Per-thread recorder state and the process-wide thread registry.
//!
//! Every application thread that takes a tracked lock gets a `Routine`:
//! its currently held locks, plus the lock-tree of dependencies observed so
//! far. All mutation happens from the owning thread; the periodic detector
//! observes through the per-routine mutex (brief, bounded critical
//! sections on both sides).

use crate::core::caller::{self, CallerInfo};
use crate::core::config::{self, Config};
use crate::core::dependency::{Dependency, Held, dependency_key};
use crate::core::locks::LockMeta;
use crate::core::types::{LockId, RoutineIndex};
use fxhash::{FxHashMap, FxHashSet};
use parking_lot::{Mutex, RwLock};
use std::cell::Cell;
use std::panic::Location;
use std::sync::Arc;
use std::thread::ThreadId;

/// Recorder state for one registered thread.
pub(crate) struct Routine {
    index: RoutineIndex,
    /// Locks currently held, outermost first. An acquisition enters this
    /// set before the primitive lock is taken, so a blocked thread's
    /// innermost entry is the lock it is waiting for.
    holding: Vec<Held>,
    /// Recorded dependencies; slots are never vacated.
    dependencies: Vec<Dependency>,
    /// Hash-hint key → pool slots sharing it.
    dependency_map: FxHashMap<usize, Vec<usize>>,
    /// Slot of the dependency recorded by the most recent nested
    /// acquisition; consumed by the periodic detector.
    cur_dep: Option<usize>,
    /// Sites of single-level acquisitions already noted on their lock.
    single_level_sites: FxHashSet<(&'static str, u32)>,
}

impl Routine {
    fn new(index: RoutineIndex, cfg: &Config) -> Self {
        Routine {
            index,
            holding: Vec::with_capacity(cfg.max_holding_depth),
            dependencies: Vec::with_capacity(cfg.max_dependencies),
            dependency_map: FxHashMap::default(),
            cur_dep: None,
            single_level_sites: FxHashSet::default(),
        }
    }

    pub fn holding_count(&self) -> usize {
        self.holding.len()
    }

    /// The most deeply nested hold, if any.
    pub fn innermost(&self) -> Option<LockId> {
        self.holding.last().map(Held::id)
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// The current dependency with its pool slot, for the periodic DFS.
    pub fn current_dependency(&self) -> Option<(usize, Dependency)> {
        self.cur_dep.map(|slot| (slot, self.dependencies[slot].clone()))
    }

    pub fn clear_current_dependency(&mut self) {
        self.cur_dep = None;
    }

    /// Record a blocking acquisition: update the lock tree, then extend the
    /// holding set.
    pub fn on_lock(
        &mut self,
        lock: &Arc<LockMeta>,
        read: bool,
        site: &'static Location<'static>,
        cfg: &Config,
    ) {
        let depth = self.holding.len();
        // A re-entrant shared hold extends the holding set only: a
        // dependency never lists its own lock among the holds.
        let reentrant = self.holding.iter().any(|h| h.id() == lock.id());

        let mut noted = false;
        if depth > 0 && !reentrant {
            let key = dependency_key(lock, &self.holding[depth - 1].lock);
            if !self.has_recorded(key, lock) {
                if self.dependencies.len() >= cfg.max_dependencies {
                    panic!(
                        "dependency pool of thread {} is full ({}); increase max_dependencies",
                        self.index, cfg.max_dependencies
                    );
                }
                let slot = self.dependencies.len();
                self.dependencies
                    .push(Dependency::new(Arc::clone(lock), read, &self.holding));
                self.dependency_map.entry(key).or_default().push(slot);
                self.cur_dep = Some(slot);
                noted = true;
            }
        } else if depth == 0
            && cfg.collect_single_level_lock_stack
            && self.single_level_sites.insert((site.file(), site.line()))
        {
            noted = true;
        }

        if noted {
            let backtrace = cfg
                .collect_call_stack
                .then(|| caller::capture_backtrace(cfg.max_call_stack_size));
            lock.push_context(CallerInfo::acquisition(site, backtrace));
        }

        self.push_holding(lock, read, cfg);
    }

    /// Record a successful non-blocking acquisition. Only the holding set
    /// is extended; try-acquisitions contribute no dependency.
    pub fn on_try_lock(&mut self, lock: &Arc<LockMeta>, read: bool, cfg: &Config) {
        self.push_holding(lock, read, cfg);
    }

    /// Record a release: drop the topmost occurrence of the lock, keeping
    /// the order of the remaining holds. An absent lock is tolerated
    /// (overlapping rw-lock sequences can release out of recorded order).
    pub fn on_unlock(&mut self, lock: &LockMeta) {
        if let Some(pos) = self.holding.iter().rposition(|h| h.id() == lock.id()) {
            self.holding.remove(pos);
        }
    }

    /// Exact membership test for ⟨lock, current holding set⟩ among the
    /// dependencies filed under `key`.
    fn has_recorded(&self, key: usize, lock: &LockMeta) -> bool {
        self.dependency_map.get(&key).is_some_and(|slots| {
            slots
                .iter()
                .any(|&slot| self.dependencies[slot].matches(lock, &self.holding))
        })
    }

    fn push_holding(&mut self, lock: &Arc<LockMeta>, read: bool, cfg: &Config) {
        if self.holding.len() >= cfg.max_holding_depth {
            panic!(
                "thread {} holds more than max_holding_depth ({}) locks; increase max_holding_depth",
                self.index, cfg.max_holding_depth
            );
        }
        self.holding.push(Held {
            lock: Arc::clone(lock),
            read,
        });
    }
}

struct Registry {
    /// Native thread id → dense index. Registration serialises through
    /// this mutex; the dense cursor is the routine vector's length.
    index_map: Mutex<FxHashMap<ThreadId, RoutineIndex>>,
    /// Append-only; indices are stable for the process lifetime.
    routines: RwLock<Vec<Arc<Mutex<Routine>>>>,
}

lazy_static::lazy_static! {
    static ref REGISTRY: Registry = Registry {
        index_map: Mutex::new(FxHashMap::default()),
        routines: RwLock::new(Vec::new()),
    };
}

thread_local! {
    static CURRENT: Cell<Option<RoutineIndex>> = const { Cell::new(None) };
}

/// Pre-register the calling thread with the detector.
///
/// Registration otherwise happens on the thread's first tracked
/// acquisition; calling this at thread start moves the cost up front and
/// guarantees the thread a dense index even before it locks anything.
/// Does nothing when detection is disabled entirely.
pub fn register_thread() {
    let cfg = config::get();
    if !cfg.periodic_detection && !cfg.comprehensive_detection {
        return;
    }
    ensure_current();
}

/// Dense index of the calling thread, registering it on first use.
pub(crate) fn ensure_current() -> RoutineIndex {
    if let Some(index) = CURRENT.with(Cell::get) {
        return index;
    }

    let id = std::thread::current().id();
    let mut map = REGISTRY.index_map.lock();
    let index = match map.get(&id).copied() {
        Some(index) => index,
        None => {
            let cfg = config::get();
            let mut routines = REGISTRY.routines.write();
            let index = routines.len();
            if index >= cfg.max_routines {
                panic!(
                    "thread registration exceeds max_routines ({}); increase max_routines",
                    cfg.max_routines
                );
            }
            routines.push(Arc::new(Mutex::new(Routine::new(index, &cfg))));
            map.insert(id, index);
            index
        }
    };
    drop(map);

    CURRENT.with(|c| c.set(Some(index)));
    index
}

/// Dense index of the calling thread, if it ever registered.
pub(crate) fn try_current() -> Option<RoutineIndex> {
    if let Some(index) = CURRENT.with(Cell::get) {
        return Some(index);
    }
    let id = std::thread::current().id();
    let index = REGISTRY.index_map.lock().get(&id).copied();
    if let Some(index) = index {
        CURRENT.with(|c| c.set(Some(index)));
    }
    index
}

/// Number of registered threads.
pub(crate) fn count() -> usize {
    REGISTRY.routines.read().len()
}

/// Run `f` on the routine at `index`.
pub(crate) fn with<R>(index: RoutineIndex, f: impl FnOnce(&mut Routine) -> R) -> R {
    let routine = Arc::clone(&REGISTRY.routines.read()[index]);
    let mut guard = routine.lock();
    f(&mut guard)
}

/// Stable snapshot of the routine handles for the detectors to iterate.
pub(crate) fn handles() -> Vec<Arc<Mutex<Routine>>> {
    REGISTRY.routines.read().clone()
}
