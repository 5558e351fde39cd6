use interlock::{DeadlockKind, Interlock, Mutex, thread};
use std::sync::Arc;
use std::time::Duration;

mod common;
use common::{DETECT_TIMEOUT, expect_report, start_detector};

/// A real deadlock: each thread holds one lock and blocks on the other.
/// The periodic detector must confirm the cycle once it is stable. The
/// exit policy is turned off so the report can be observed in-process; the
/// two workers stay parked in their `lock` calls and are never joined.
#[test]
fn live_cycle_is_confirmed_by_the_periodic_detector() {
    let harness = start_detector(
        Interlock::new()
            .with_periodic_interval(Duration::from_millis(50))
            .with_comprehensive_detection(false)
            .with_exit_on_deadlock(false),
    );

    let x = Arc::new(Mutex::new(()));
    let y = Arc::new(Mutex::new(()));

    let (x1, y1) = (Arc::clone(&x), Arc::clone(&y));
    let _t1 = thread::spawn(move || {
        let _x = x1.lock();
        thread::sleep(Duration::from_millis(150));
        let _y = y1.lock();
    });

    let (x2, y2) = (Arc::clone(&x), Arc::clone(&y));
    let _t2 = thread::spawn(move || {
        let _y = y2.lock();
        thread::sleep(Duration::from_millis(150));
        let _x = x2.lock();
    });

    let info = expect_report(&harness, DeadlockKind::Confirmed, DETECT_TIMEOUT);
    assert_eq!(info.thread_cycle.len(), 2);
    assert_eq!(info.lock_cycle.len(), 2);
    assert!(info.lock_cycle.contains(&x.id()));
    assert!(info.lock_cycle.contains(&y.id()));
}
