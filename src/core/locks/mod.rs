mod meta;
mod mutex;
mod ops;
mod rwlock;

pub(crate) use meta::LockMeta;
pub use mutex::{Mutex, MutexGuard};
pub use rwlock::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::core::types::LockId;
use std::sync::atomic::{AtomicUsize, Ordering};

// Lock ids start at 1 and are never reused; dependencies recorded against a
// lock stay valid for the lifetime of the process.
static NEXT_LOCK_ID: AtomicUsize = AtomicUsize::new(1);

pub(crate) fn next_lock_id() -> LockId {
    NEXT_LOCK_ID.fetch_add(1, Ordering::SeqCst)
}
