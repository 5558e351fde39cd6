use interlock::{Interlock, RwLock, finalize, thread};
use std::sync::Arc;

mod common;
use common::{QUIET_TIMEOUT, assert_quiet, start_detector};

/// Two threads nest read holds of the same pair of rw-locks in opposite
/// order. Readers never block each other, so the inverted order is
/// harmless and the cycle filter must drop it.
#[test]
fn reader_only_cycle_is_filtered() {
    let harness = start_detector(
        Interlock::new()
            .with_periodic_detection(false)
            .with_exit_on_deadlock(false),
    );

    let a = Arc::new(RwLock::new(()));
    let b = Arc::new(RwLock::new(()));

    let (a1, b1) = (Arc::clone(&a), Arc::clone(&b));
    thread::spawn(move || {
        for _ in 0..10 {
            let _a = a1.read();
            let _b = b1.read();
        }
    })
    .join()
    .unwrap();

    let (a2, b2) = (Arc::clone(&a), Arc::clone(&b));
    thread::spawn(move || {
        for _ in 0..10 {
            let _b = b2.read();
            let _a = a2.read();
        }
    })
    .join()
    .unwrap();

    finalize();
    assert_quiet(&harness, QUIET_TIMEOUT);
}
