use interlock::{Interlock, Mutex, finalize, thread};
use std::sync::Arc;

mod common;
use common::{QUIET_TIMEOUT, assert_quiet, start_detector};

/// A try-acquisition that succeeds never waited on anyone, so it records
/// no lock-order evidence: the inverted pair below stays silent where
/// blocking acquisitions would have been flagged.
#[test]
fn successful_try_lock_records_no_dependency() {
    let harness = start_detector(
        Interlock::new()
            .with_periodic_detection(false)
            .with_exit_on_deadlock(false),
    );

    let x = Arc::new(Mutex::new(()));
    let y = Arc::new(Mutex::new(()));

    let (x1, y1) = (Arc::clone(&x), Arc::clone(&y));
    thread::spawn(move || {
        for _ in 0..10 {
            let _x = x1.lock();
            let inner = y1.try_lock();
            assert!(inner.is_some(), "uncontended try_lock must succeed");
        }
    })
    .join()
    .unwrap();

    let (x2, y2) = (Arc::clone(&x), Arc::clone(&y));
    thread::spawn(move || {
        for _ in 0..10 {
            let _y = y2.lock();
            let inner = x2.try_lock();
            assert!(inner.is_some(), "uncontended try_lock must succeed");
        }
    })
    .join()
    .unwrap();

    finalize();
    assert_quiet(&harness, QUIET_TIMEOUT);
}
