use interlock::{Interlock, RwLock, finalize, thread};
use std::sync::Arc;

mod common;
use common::{QUIET_TIMEOUT, assert_quiet, start_detector};

/// A thread may take a read lock it already shares: reader re-entry on an
/// rw-lock is not double locking and both holds succeed.
#[test]
fn reader_reentry_is_not_a_double_lock() {
    let harness = start_detector(
        Interlock::new()
            .with_periodic_detection(false)
            .with_exit_on_deadlock(false),
    );

    let lock = Arc::new(RwLock::new(7));
    let clone = Arc::clone(&lock);
    thread::spawn(move || {
        let first = clone.read();
        let second = clone.read();
        assert_eq!((*first, *second), (7, 7));
    })
    .join()
    .unwrap();

    // Re-entry released cleanly: a writer can get in afterwards.
    *lock.write() += 1;
    assert_eq!(*lock.read(), 8);

    finalize();
    assert_quiet(&harness, QUIET_TIMEOUT);
}
