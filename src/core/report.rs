//! Report sink and deadlock callback dispatch.
//!
//! Reports are written to a [`Reporter`] sink (stderr by default, with the
//! same coloured sections for every report kind) and additionally handed to
//! the registered callback as a [`DeadlockInfo`]. Callback execution runs
//! on a dedicated dispatcher thread: a confirmed deadlock is detected by a
//! thread that may itself be part of the cycle, and it must still be able
//! to hand the report off.

use crate::core::caller::CallerInfo;
use crate::core::config;
use crate::core::dependency::DepStack;
use crate::core::locks::LockMeta;
use crate::core::types::{DeadlockInfo, DeadlockKind, LockId, RoutineIndex};
use chrono::Utc;
use crossbeam_channel::{Sender, unbounded};
use parking_lot::RwLock;
use std::io::Write;
use std::sync::{Arc, OnceLock};

const RED: &str = "\x1b[1;31m";
const PURPLE: &str = "\x1b[1;35m";
const BLUE: &str = "\x1b[0;36m";
const RESET: &str = "\x1b[0m";

/// One lock of a reported cycle: who acquired it and the lock's full
/// context log, creation site first.
#[derive(Debug, Clone)]
pub struct ReportEntry {
    pub routine: RoutineIndex,
    pub lock: LockId,
    pub context: Vec<CallerInfo>,
}

/// Sink receiving every deadlock report.
///
/// Implementations must tolerate being called from any thread, including
/// the background detector. No ordering relative to application output is
/// promised.
pub trait Reporter: Send + Sync {
    /// A thread re-acquired `entry.lock`; `attempt` is the offending site.
    fn report_double_lock(&self, entry: &ReportEntry, attempt: &CallerInfo);
    /// A lock-order cycle found in the recorded dependencies.
    fn report_potential_deadlock(&self, chain: &[ReportEntry]);
    /// A live cycle confirmed by the periodic detector.
    fn report_confirmed_deadlock(&self, chain: &[ReportEntry]);
}

/// Default sink: coloured, human-readable text on standard error.
#[derive(Debug, Default)]
pub struct StderrReporter;

impl StderrReporter {
    fn chain_report(&self, headline: &str, chain: &[ReportEntry]) {
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "{RED}{headline}{RESET}\n");

        let _ = writeln!(
            err,
            "{PURPLE}Initialization of locks involved in {}:{RESET}\n",
            headline.to_lowercase()
        );
        for entry in chain {
            for info in entry.context.iter().filter(|c| c.is_creation()) {
                let _ = writeln!(err, "{info}");
            }
        }

        let _ = writeln!(
            err,
            "\n{PURPLE}Calls of locks involved in {}:{RESET}\n",
            headline.to_lowercase()
        );
        for entry in chain {
            if let Some(creation) = entry.context.first() {
                let _ = writeln!(
                    err,
                    "{BLUE}Calls for lock created at: {creation}{RESET}"
                );
            }
            for info in entry.context.iter().skip(1) {
                match &info.backtrace {
                    Some(stack) => {
                        let _ = writeln!(err, "{stack}");
                    }
                    None => {
                        let _ = writeln!(err, "{info}");
                    }
                }
            }
            let _ = writeln!(err);
        }
    }
}

impl Reporter for StderrReporter {
    fn report_double_lock(&self, entry: &ReportEntry, attempt: &CallerInfo) {
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "{RED}DEADLOCK (DOUBLE LOCKING){RESET}\n");
        let _ = writeln!(
            err,
            "{PURPLE}Initialization of lock involved in deadlock:{RESET}\n"
        );
        if let Some(creation) = entry.context.first() {
            let _ = writeln!(err, "{creation}");
        }
        let _ = writeln!(err, "\n{PURPLE}Calls of lock involved in deadlock:{RESET}\n");
        for info in entry.context.iter().skip(1) {
            let _ = writeln!(err, "{info}");
        }
        let _ = writeln!(err, "{attempt}\n");
    }

    fn report_potential_deadlock(&self, chain: &[ReportEntry]) {
        self.chain_report("POTENTIAL DEADLOCK", chain);
    }

    fn report_confirmed_deadlock(&self, chain: &[ReportEntry]) {
        self.chain_report("DEADLOCK", chain);
    }
}

lazy_static::lazy_static! {
    static ref REPORTER: RwLock<Arc<dyn Reporter>> = RwLock::new(Arc::new(StderrReporter));

    // Callbacks run on this thread so a deadlocked detecting thread can
    // still hand reports off.
    static ref DISPATCHER: Dispatcher = Dispatcher::new();
}

static CALLBACK: OnceLock<Arc<dyn Fn(DeadlockInfo) + Send + Sync>> = OnceLock::new();

struct Dispatcher {
    sender: Sender<DeadlockInfo>,
    _thread_handle: std::thread::JoinHandle<()>,
}

impl Dispatcher {
    fn new() -> Self {
        let (tx, rx) = unbounded::<DeadlockInfo>();

        let thread_handle = std::thread::spawn(move || {
            while let Ok(info) = rx.recv() {
                if let Some(cb) = CALLBACK.get() {
                    cb(info);
                }
            }
        });

        Dispatcher {
            sender: tx,
            _thread_handle: thread_handle,
        }
    }

    fn send(&self, info: DeadlockInfo) {
        let _ = self.sender.send(info);
    }
}

/// Install the deadlock callback. Only the first installation takes
/// effect.
pub(crate) fn set_callback_arc(callback: Arc<dyn Fn(DeadlockInfo) + Send + Sync>) {
    CALLBACK.set(callback).ok();
}

/// Replace the report sink. Refused once the detector is initialized.
pub(crate) fn set_reporter(reporter: Arc<dyn Reporter>) -> bool {
    if config::is_frozen() {
        return false;
    }
    *REPORTER.write() = reporter;
    true
}

fn entries_of(stack: &DepStack) -> Vec<ReportEntry> {
    stack
        .entries()
        .iter()
        .map(|entry| ReportEntry {
            routine: entry.routine,
            lock: entry.dep.lock_id(),
            context: entry.dep.lock.context_log(),
        })
        .collect()
}

fn info_of(kind: DeadlockKind, chain: &[ReportEntry]) -> DeadlockInfo {
    DeadlockInfo {
        kind,
        thread_cycle: chain.iter().map(|e| e.routine).collect(),
        lock_cycle: chain.iter().map(|e| e.lock).collect(),
        timestamp: Utc::now().to_rfc3339(),
    }
}

/// Report a same-thread re-acquisition.
pub(crate) fn double_lock(meta: &LockMeta, routine: RoutineIndex, attempt: &CallerInfo) {
    let entry = ReportEntry {
        routine,
        lock: meta.id(),
        context: meta.context_log(),
    };
    tracing::error!(lock = entry.lock, routine, "double lock detected");
    REPORTER.read().report_double_lock(&entry, attempt);
    DISPATCHER.send(DeadlockInfo {
        kind: DeadlockKind::DoubleLock,
        thread_cycle: vec![routine],
        lock_cycle: vec![entry.lock],
        timestamp: Utc::now().to_rfc3339(),
    });
}

/// Report a cycle found in the recorded dependencies. `stack` holds the
/// complete cycle.
pub(crate) fn potential_deadlock(stack: &DepStack) {
    let chain = entries_of(stack);
    tracing::warn!(locks = ?chain.iter().map(|e| e.lock).collect::<Vec<_>>(),
        "potential deadlock cycle");
    REPORTER.read().report_potential_deadlock(&chain);
    DISPATCHER.send(info_of(DeadlockKind::Potential, &chain));
}

/// Report a live cycle confirmed by the periodic detector.
pub(crate) fn confirmed_deadlock(stack: &DepStack) {
    let chain = entries_of(stack);
    tracing::error!(locks = ?chain.iter().map(|e| e.lock).collect::<Vec<_>>(),
        "confirmed deadlock");
    REPORTER.read().report_confirmed_deadlock(&chain);
    DISPATCHER.send(info_of(DeadlockKind::Confirmed, &chain));
}
