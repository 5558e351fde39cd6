//! A tracked reader-writer lock.
//!
//! Same interface as a plain rw-lock; every shared and exclusive
//! acquisition is reported to the deadlock detector together with whether
//! it was a read. The distinction matters twice over: shared re-entry by
//! the same thread is not a double lock, and cycles that only ever meet
//! reader holds cannot deadlock and are filtered from the reports.

use crate::core::locks::meta::LockMeta;
use crate::core::locks::ops;
use crate::core::types::{LockId, LockKind};
use parking_lot::{
    RwLock as ParkingLotRwLock, RwLockReadGuard as ParkingLotReadGuard,
    RwLockWriteGuard as ParkingLotWriteGuard,
};
use std::fmt;
use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};
use std::panic::Location;
use std::sync::Arc;

/// A reader-writer lock wired into the deadlock detector.
///
/// # Example
///
/// ```rust
/// use interlock::RwLock;
///
/// let lock = RwLock::new(10);
/// {
///     let value = lock.read();
///     assert_eq!(*value, 10);
/// }
/// *lock.write() += 1;
/// assert_eq!(*lock.read(), 11);
/// ```
pub struct RwLock<T> {
    meta: Arc<LockMeta>,
    inner: ParkingLotRwLock<T>,
}

/// Guard for a shared (read) hold; reports the release when dropped.
pub struct RwLockReadGuard<'a, T> {
    meta: Arc<LockMeta>,
    inner: ManuallyDrop<ParkingLotReadGuard<'a, T>>,
}

/// Guard for an exclusive (write) hold; reports the release when dropped.
pub struct RwLockWriteGuard<'a, T> {
    meta: Arc<LockMeta>,
    inner: ManuallyDrop<ParkingLotWriteGuard<'a, T>>,
}

impl<T> RwLock<T> {
    /// Create a new tracked rw-lock holding `value`.
    #[track_caller]
    pub fn new(value: T) -> Self {
        crate::core::detector::ensure_initialized();
        let meta = LockMeta::new(
            LockKind::ReaderWriter,
            ops::creation_info(Location::caller()),
        );
        RwLock {
            meta,
            inner: ParkingLotRwLock::new(value),
        }
    }

    /// The stable identifier this lock is known by in reports.
    pub fn id(&self) -> LockId {
        self.meta.id()
    }

    /// Acquire a shared (read) hold, blocking until no writer is in the
    /// way.
    #[track_caller]
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        ops::before_acquire(&self.meta, true, Location::caller());
        let guard = self.inner.read();
        ops::after_acquire(&self.meta);
        RwLockReadGuard {
            meta: Arc::clone(&self.meta),
            inner: ManuallyDrop::new(guard),
        }
    }

    /// Acquire the exclusive (write) hold, blocking until all other holds
    /// are gone.
    #[track_caller]
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        ops::before_acquire(&self.meta, false, Location::caller());
        let guard = self.inner.write();
        ops::after_acquire(&self.meta);
        RwLockWriteGuard {
            meta: Arc::clone(&self.meta),
            inner: ManuallyDrop::new(guard),
        }
    }

    /// Take a shared hold only if it is available right now.
    pub fn try_read(&self) -> Option<RwLockReadGuard<'_, T>> {
        let guard = self.inner.try_read()?;
        ops::after_try_acquire(&self.meta, true);
        Some(RwLockReadGuard {
            meta: Arc::clone(&self.meta),
            inner: ManuallyDrop::new(guard),
        })
    }

    /// Take the exclusive hold only if it is available right now.
    pub fn try_write(&self) -> Option<RwLockWriteGuard<'_, T>> {
        let guard = self.inner.try_write()?;
        ops::after_try_acquire(&self.meta, false);
        Some(RwLockWriteGuard {
            meta: Arc::clone(&self.meta),
            inner: ManuallyDrop::new(guard),
        })
    }

    /// Mutable access without locking; the exclusive borrow guarantees no
    /// guard exists.
    pub fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }

    /// Consume the lock, returning the protected value.
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T: Default> Default for RwLock<T> {
    fn default() -> Self {
        RwLock::new(T::default())
    }
}

impl<T> From<T> for RwLock<T> {
    fn from(value: T) -> Self {
        RwLock::new(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for RwLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("RwLock");
        s.field("id", &self.meta.id());
        match self.inner.try_read() {
            Some(value) => s.field("data", &&*value).finish(),
            None => s.field("data", &"<locked>").finish(),
        }
    }
}

impl<T> Deref for RwLockReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> Drop for RwLockReadGuard<'_, T> {
    fn drop(&mut self) {
        ops::before_release(&self.meta);
        // Order as in MutexGuard: recorder, primitive release, bookkeeping.
        unsafe { ManuallyDrop::drop(&mut self.inner) };
        ops::after_release(&self.meta);
    }
}

impl<T> Deref for RwLockWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> DerefMut for RwLockWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl<T> Drop for RwLockWriteGuard<'_, T> {
    fn drop(&mut self) {
        ops::before_release(&self.meta);
        unsafe { ManuallyDrop::drop(&mut self.inner) };
        ops::after_release(&self.meta);
    }
}
