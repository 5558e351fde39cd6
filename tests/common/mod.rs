use interlock::{DeadlockInfo, DeadlockKind, Interlock, register_thread};
use std::sync::mpsc;
use std::time::Duration;

#[allow(dead_code)]
pub const DETECT_TIMEOUT: Duration = Duration::from_secs(3);
#[allow(dead_code)]
pub const QUIET_TIMEOUT: Duration = Duration::from_millis(500);

pub struct DetectorHarness {
    pub rx: mpsc::Receiver<DeadlockInfo>,
}

/// Start the detector with the given configuration and a callback feeding
/// every report into a channel. Also registers the test's main thread so
/// recording is active as soon as the first worker starts.
pub fn start_detector(builder: Interlock) -> DetectorHarness {
    let (tx, rx) = mpsc::channel::<DeadlockInfo>();

    builder
        .callback(move |info| {
            let _ = tx.send(info);
        })
        .start()
        .expect("failed to start detector");

    register_thread();
    DetectorHarness { rx }
}

#[allow(dead_code)]
pub fn expect_report(
    harness: &DetectorHarness,
    kind: DeadlockKind,
    timeout: Duration,
) -> DeadlockInfo {
    match harness.rx.recv_timeout(timeout) {
        Ok(info) => {
            assert_eq!(info.kind, kind, "unexpected report kind: {info:?}");
            info
        }
        Err(_) => panic!("no {kind:?} report within {timeout:?}"),
    }
}

#[allow(dead_code)]
pub fn assert_quiet(harness: &DetectorHarness, timeout: Duration) {
    if let Ok(info) = harness.rx.recv_timeout(timeout) {
        panic!("unexpected deadlock report: {info:?}");
    }
}
