//! # Interlock
//!
//! A dynamic deadlock detector built into drop-in lock replacements.
//!
//! Interlock ships [`Mutex`] and [`RwLock`] wrappers that behave like
//! their plain counterparts while feeding every acquisition and release to
//! a detector. The detector works two ways at once:
//!
//! - **Live detection**: a background task periodically inspects what each
//!   thread currently holds and waits for. A cycle of mutually waiting
//!   threads that stays put across the observation window is a confirmed
//!   deadlock — reported and, by default, fatal to the process.
//! - **Lock-order analysis**: every nested acquisition records which locks
//!   the thread already held. At program end, [`finalize`] searches these
//!   records across all threads for cyclic lock orderings: deadlocks that
//!   *could* have happened under a different interleaving, even if this
//!   run sailed through.
//!
//! Reports carry the creation and acquisition sites of every lock in the
//! cycle, and optionally full call stacks. Same-thread double locking is
//! caught at the offending acquisition.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use interlock::{Interlock, Mutex, finalize, thread};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! Interlock::new()
//!     .callback(|info| {
//!         eprintln!("deadlock! threads: {:?}", info.thread_cycle);
//!     })
//!     .start()
//!     .expect("detector already running");
//!
//! let a = Arc::new(Mutex::new("A"));
//! let b = Arc::new(Mutex::new("B"));
//!
//! // Two threads taking the same pair in opposite order: the classic
//! // recipe. Even if the timing works out this run, the lock-order
//! // analysis at the end will flag it.
//! let (a1, b1) = (Arc::clone(&a), Arc::clone(&b));
//! let t1 = thread::spawn(move || {
//!     let _a = a1.lock();
//!     thread::sleep(Duration::from_millis(50));
//!     let _b = b1.lock();
//! });
//! let (a2, b2) = (Arc::clone(&a), Arc::clone(&b));
//! let t2 = thread::spawn(move || {
//!     let _b = b2.lock();
//!     thread::sleep(Duration::from_millis(50));
//!     let _a = a2.lock();
//! });
//!
//! let _ = t1.join();
//! let _ = t2.join();
//! finalize();
//! ```
//!
//! ## Reader/writer awareness
//!
//! [`RwLock`] acquisitions record whether they were shared. A thread may
//! re-take a read lock it already shares without tripping the double-lock
//! check, and cycles whose conflicting edges are all reader-on-reader are
//! filtered out — readers do not block each other, so such a cycle cannot
//! deadlock.
//!
//! ## Costs and limits
//!
//! Detector state is bounded up front: per-thread dependency pools,
//! holding depth, and thread count all have configurable limits (see
//! [`config`]). Exceeding one is a panic naming the limit to raise.
//! Options freeze once the detector starts.

mod core;

pub use crate::core::{
    CallSite, CallerInfo, DEADLOCK_EXIT_CODE, DeadlockInfo, DeadlockKind, Interlock, LockId,
    Mutex, MutexGuard, ReportEntry, Reporter, RoutineIndex, RwLock, RwLockReadGuard,
    RwLockWriteGuard, StartError, StderrReporter, config, finalize, initialize, register_thread,
    thread,
};
