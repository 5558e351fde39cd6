//! Detector configuration.
//!
//! All options must be chosen before the detector starts: the first
//! initialization (explicit or through first lock use) freezes them, and
//! every setter returns `false` from then on.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

lazy_static::lazy_static! {
    static ref CONFIG: RwLock<Config> = RwLock::new(Config::default());
}

static FROZEN: AtomicBool = AtomicBool::new(false);

/// The complete option set of the detector.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Run the background detector that confirms live deadlocks.
    pub periodic_detection: bool,
    /// Run the end-of-program search for potential deadlocks.
    pub comprehensive_detection: bool,
    /// Interval between background detection passes.
    pub periodic_interval: Duration,
    /// Capture a call stack for every recorded acquisition.
    pub collect_call_stack: bool,
    /// Record context for acquisitions made while holding no other lock.
    pub collect_single_level_lock_stack: bool,
    /// Report when a thread re-locks a lock it already holds.
    pub check_double_locking: bool,
    /// Per-thread dependency pool size.
    pub max_dependencies: usize,
    /// Maximum number of locks a thread may hold at once.
    pub max_holding_depth: usize,
    /// Maximum number of registered threads.
    pub max_routines: usize,
    /// Byte budget for each captured call stack.
    pub max_call_stack_size: usize,
    /// Terminate the process on a confirmed deadlock or double-lock.
    pub exit_on_deadlock: bool,
    /// Run the comprehensive search before exiting on a confirmed deadlock.
    pub comprehensive_on_confirmation: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            periodic_detection: true,
            comprehensive_detection: true,
            periodic_interval: Duration::from_secs(2),
            collect_call_stack: false,
            collect_single_level_lock_stack: false,
            check_double_locking: true,
            max_dependencies: 4096,
            max_holding_depth: 128,
            max_routines: 1024,
            max_call_stack_size: 2048,
            exit_on_deadlock: true,
            comprehensive_on_confirmation: false,
        }
    }
}

/// Snapshot of the current configuration.
pub fn get() -> Config {
    *CONFIG.read()
}

/// Freeze the configuration. Called once by detector initialization.
pub(crate) fn freeze() {
    FROZEN.store(true, Ordering::SeqCst);
}

pub(crate) fn is_frozen() -> bool {
    FROZEN.load(Ordering::SeqCst)
}

/// Apply `f` to the configuration unless it is already frozen.
/// Returns `false` if the detector has been initialized.
fn update(f: impl FnOnce(&mut Config)) -> bool {
    // The freeze flag is checked under the write lock so a setter racing
    // with initialization cannot slip in after the detector read its
    // options.
    let mut cfg = CONFIG.write();
    if is_frozen() {
        return false;
    }
    f(&mut cfg);
    true
}

/// Install a whole option set at once (used by the builder).
pub(crate) fn replace(cfg: Config) -> bool {
    update(|c| *c = cfg)
}

pub fn set_periodic_detection(enabled: bool) -> bool {
    update(|c| c.periodic_detection = enabled)
}

pub fn set_comprehensive_detection(enabled: bool) -> bool {
    update(|c| c.comprehensive_detection = enabled)
}

pub fn set_periodic_interval(interval: Duration) -> bool {
    update(|c| c.periodic_interval = interval)
}

pub fn set_collect_call_stack(enabled: bool) -> bool {
    update(|c| c.collect_call_stack = enabled)
}

pub fn set_collect_single_level_lock_stack(enabled: bool) -> bool {
    update(|c| c.collect_single_level_lock_stack = enabled)
}

pub fn set_check_double_locking(enabled: bool) -> bool {
    update(|c| c.check_double_locking = enabled)
}

pub fn set_max_dependencies(max: usize) -> bool {
    update(|c| c.max_dependencies = max)
}

pub fn set_max_holding_depth(max: usize) -> bool {
    update(|c| c.max_holding_depth = max)
}

pub fn set_max_routines(max: usize) -> bool {
    update(|c| c.max_routines = max)
}

pub fn set_max_call_stack_size(bytes: usize) -> bool {
    update(|c| c.max_call_stack_size = bytes)
}

pub fn set_exit_on_deadlock(enabled: bool) -> bool {
    update(|c| c.exit_on_deadlock = enabled)
}

pub fn set_comprehensive_on_confirmation(enabled: bool) -> bool {
    update(|c| c.comprehensive_on_confirmation = enabled)
}
