use interlock::{Interlock, Mutex, finalize, thread};
use std::sync::Arc;

mod common;
use common::{QUIET_TIMEOUT, assert_quiet, start_detector};

/// Two threads nesting the same pair in the same order: a consistent lock
/// hierarchy, nothing to report.
#[test]
fn consistent_order_stays_quiet() {
    let harness = start_detector(
        Interlock::new()
            .with_periodic_detection(false)
            .with_exit_on_deadlock(false),
    );

    let x = Arc::new(Mutex::new(()));
    let y = Arc::new(Mutex::new(()));

    for _ in 0..2 {
        let (xi, yi) = (Arc::clone(&x), Arc::clone(&y));
        thread::spawn(move || {
            for _ in 0..10 {
                let _x = xi.lock();
                let _y = yi.lock();
            }
        })
        .join()
        .unwrap();
    }

    finalize();
    assert_quiet(&harness, QUIET_TIMEOUT);
}
