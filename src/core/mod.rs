mod builder;
mod caller;
pub mod config;
mod dependency;
mod detector;
mod locks;
mod report;
mod routine;
pub mod thread;
mod types;

pub use builder::{Interlock, StartError};
pub use caller::{CallSite, CallerInfo};
pub use detector::{finalize, initialize};
pub use locks::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
pub use report::{ReportEntry, Reporter, StderrReporter};
pub use routine::register_thread;
pub use types::{DEADLOCK_EXIT_CODE, DeadlockInfo, DeadlockKind, LockId, RoutineIndex};
