use serde::{Deserialize, Serialize};

/// Stable numeric identity of a lock. Assigned at creation from a global
/// counter and never recycled while detection is active.
pub type LockId = usize;

/// Dense index of a registered thread.
pub type RoutineIndex = usize;

/// Exit code used when a confirmed deadlock or double-lock terminates the
/// process.
pub const DEADLOCK_EXIT_CODE: i32 = 2;

/// The two lock flavours the detector instruments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockKind {
    /// A plain mutual-exclusion lock.
    Exclusive,
    /// A reader/writer lock; readers may share it.
    ReaderWriter,
}

/// Classification of a deadlock report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeadlockKind {
    /// A lock-order cycle found in the recorded dependencies. The involved
    /// threads were not necessarily stuck when it was found.
    Potential,
    /// A cycle in the live wait state that stayed stable across the
    /// detector's observation window.
    Confirmed,
    /// The same thread re-acquired a lock it already holds.
    DoubleLock,
}

/// Payload handed to the deadlock callback for every report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadlockInfo {
    /// What kind of report this is.
    pub kind: DeadlockKind,
    /// Indices of the threads forming the cycle (a single entry for a
    /// double-lock).
    pub thread_cycle: Vec<RoutineIndex>,
    /// The locks acquired around the cycle, in chain order.
    pub lock_cycle: Vec<LockId>,
    /// RFC 3339 timestamp taken when the report was produced.
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadlock_info_round_trips_through_json() {
        let info = DeadlockInfo {
            kind: DeadlockKind::Potential,
            thread_cycle: vec![1, 2],
            lock_cycle: vec![11, 12],
            timestamp: "2026-08-02T12:00:00+00:00".to_string(),
        };

        let json = serde_json::to_string(&info).unwrap();
        let back: DeadlockInfo = serde_json::from_str(&json).unwrap();

        assert_eq!(back.kind, DeadlockKind::Potential);
        assert_eq!(back.thread_cycle, info.thread_cycle);
        assert_eq!(back.lock_cycle, info.lock_cycle);
        assert_eq!(back.timestamp, info.timestamp);
    }
}
