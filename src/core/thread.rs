//! Registration-aware threading helpers.
//!
//! [`spawn`] registers the child thread with the detector before running
//! the closure, so its first lock acquisition does not pay the
//! registration cost. The usual `std::thread` items are re-exported so
//! application code can switch a single import.

pub use std::thread::{JoinHandle, current, park, sleep, yield_now};

use crate::core::routine;

/// Spawn a thread that is pre-registered with the deadlock detector.
pub fn spawn<F, T>(f: F) -> JoinHandle<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    std::thread::spawn(move || {
        routine::register_thread();
        f()
    })
}
