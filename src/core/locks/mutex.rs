use crate::core::locks::meta::LockMeta;
use crate::core::locks::ops;
use crate::core::types::{LockId, LockKind};
use parking_lot::{Mutex as ParkingLotMutex, MutexGuard as ParkingLotMutexGuard};
use std::fmt;
use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};
use std::panic::Location;
use std::sync::Arc;

/// A mutual-exclusion lock whose every acquisition and release feeds the
/// deadlock detector.
///
/// Drop-in replacement for a plain mutex: `lock` returns a guard that
/// releases on drop, `try_lock` never blocks. The creation site and all
/// acquisition sites are retained so a reported cycle can name the code
/// that built it.
///
/// # Example
///
/// ```rust
/// use interlock::Mutex;
///
/// let counter = Mutex::new(0);
/// {
///     let mut value = counter.lock();
///     *value += 1;
/// } // released here
/// assert_eq!(*counter.lock(), 1);
/// ```
pub struct Mutex<T> {
    meta: Arc<LockMeta>,
    inner: ParkingLotMutex<T>,
}

/// RAII guard for [`Mutex`]; reports the release to the detector when
/// dropped.
pub struct MutexGuard<'a, T> {
    meta: Arc<LockMeta>,
    inner: ManuallyDrop<ParkingLotMutexGuard<'a, T>>,
}

impl<T> Mutex<T> {
    /// Create a new tracked mutex holding `value`, recording the call site
    /// as its creation context.
    #[track_caller]
    pub fn new(value: T) -> Self {
        crate::core::detector::ensure_initialized();
        let meta = LockMeta::new(LockKind::Exclusive, ops::creation_info(Location::caller()));
        Mutex {
            meta,
            inner: ParkingLotMutex::new(value),
        }
    }

    /// The stable identifier this mutex is known by in reports.
    pub fn id(&self) -> LockId {
        self.meta.id()
    }

    /// Acquire the lock, blocking until it is available.
    ///
    /// The detector observes the acquisition before the thread can block,
    /// so a deadlocked `lock` call is still visible to the background
    /// detector.
    #[track_caller]
    pub fn lock(&self) -> MutexGuard<'_, T> {
        ops::before_acquire(&self.meta, false, Location::caller());
        let guard = self.inner.lock();
        ops::after_acquire(&self.meta);
        MutexGuard {
            meta: Arc::clone(&self.meta),
            inner: ManuallyDrop::new(guard),
        }
    }

    /// Acquire the lock only if it is free right now.
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        let guard = self.inner.try_lock()?;
        ops::after_try_acquire(&self.meta, false);
        Some(MutexGuard {
            meta: Arc::clone(&self.meta),
            inner: ManuallyDrop::new(guard),
        })
    }

    /// Mutable access without locking; the exclusive borrow guarantees no
    /// guard exists.
    pub fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }

    /// Consume the mutex, returning the protected value.
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T: Default> Default for Mutex<T> {
    fn default() -> Self {
        Mutex::new(T::default())
    }
}

impl<T> From<T> for Mutex<T> {
    fn from(value: T) -> Self {
        Mutex::new(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for Mutex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Mutex");
        s.field("id", &self.meta.id());
        match self.inner.try_lock() {
            Some(value) => s.field("data", &&*value).finish(),
            None => s.field("data", &"<locked>").finish(),
        }
    }
}

impl<T> Deref for MutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> DerefMut for MutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl<T> Drop for MutexGuard<'_, T> {
    fn drop(&mut self) {
        ops::before_release(&self.meta);
        // Primitive release happens between the recorder update and the
        // bookkeeping decrement; `inner` is never touched again.
        unsafe { ManuallyDrop::drop(&mut self.inner) };
        ops::after_release(&self.meta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_gives_access_and_releases() {
        let mutex = Mutex::new(5);
        {
            let mut value = mutex.lock();
            *value = 7;
        }
        assert_eq!(*mutex.lock(), 7);
        assert_eq!(mutex.meta.locked_count(), 0);
    }

    #[test]
    fn try_lock_fails_while_held() {
        let mutex = Mutex::new(());
        let _guard = mutex.lock();
        assert!(mutex.try_lock().is_none());
    }

    #[test]
    fn into_inner_returns_the_value() {
        let mutex = Mutex::new(String::from("hello"));
        assert_eq!(mutex.into_inner(), "hello");
    }
}
