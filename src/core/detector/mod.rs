//! Detector lifecycle.
//!
//! The detector starts either explicitly through [`initialize`] (or the
//! builder) or implicitly when the first tracked lock is created or taken.
//! Starting freezes the configuration and, when enabled, launches the
//! periodic background task. [`finalize`] runs the comprehensive analysis
//! over everything recorded; call it near the end of the program.

pub(crate) mod chain;
pub(crate) mod comprehensive;
pub(crate) mod periodic;

use crate::core::config;
use std::sync::atomic::{AtomicBool, Ordering};

static INITIALIZED: AtomicBool = AtomicBool::new(false);
static FINALIZED: AtomicBool = AtomicBool::new(false);

/// Start the deadlock detector. Idempotent: only the first call (or first
/// lock use) has any effect; the configuration is frozen from then on.
pub fn initialize() {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }
    config::freeze();
    let cfg = config::get();
    tracing::debug!(
        periodic = cfg.periodic_detection,
        comprehensive = cfg.comprehensive_detection,
        interval = ?cfg.periodic_interval,
        "deadlock detector started"
    );
    if cfg.periodic_detection {
        periodic::spawn(cfg.periodic_interval);
    }
}

pub(crate) fn ensure_initialized() {
    if !INITIALIZED.load(Ordering::SeqCst) {
        initialize();
    }
}

/// Run the comprehensive lock-order analysis over all recorded
/// dependencies and report every potential deadlock found. Safe to call
/// more than once; only the first call analyzes.
///
/// Applications are expected to call this once application threads have
/// stopped taking tracked locks, typically right before exiting.
pub fn finalize() {
    if FINALIZED.swap(true, Ordering::SeqCst) {
        return;
    }
    if !config::get().comprehensive_detection {
        return;
    }
    comprehensive::run();
}
