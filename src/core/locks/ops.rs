//! The operations both lock wrappers drive on every acquire and release.
//!
//! Detector state is updated before the primitive lock is taken: a thread
//! about to block on a nested acquisition has already published the
//! dependency and extended its holding set, which is exactly what the
//! periodic detector needs to see a cycle of mutually waiting threads.
//! The outstanding-acquisition count moves after the primitive operation
//! on both paths.

use crate::core::caller::{self, CallerInfo};
use crate::core::config;
use crate::core::detector;
use crate::core::locks::LockMeta;
use crate::core::report;
use crate::core::routine;
use crate::core::types::{DEADLOCK_EXIT_CODE, LockKind};
use std::panic::Location;
use std::sync::Arc;

/// Build the creation-site record for a new lock.
pub(crate) fn creation_info(site: &'static Location<'static>) -> CallerInfo {
    let cfg = config::get();
    let mut info = CallerInfo::creation(site);
    if cfg.collect_call_stack {
        info.backtrace = Some(caller::capture_backtrace(cfg.max_call_stack_size));
    }
    info
}

/// Detector updates preceding a blocking acquisition.
pub(crate) fn before_acquire(meta: &Arc<LockMeta>, read: bool, site: &'static Location<'static>) {
    detector::ensure_initialized();

    let cfg = config::get();
    if !cfg.periodic_detection && !cfg.comprehensive_detection {
        return;
    }

    let index = routine::ensure_current();

    if cfg.check_double_locking
        && let Some(holder) = meta.holder(index)
        && holder.count > 0
    {
        // Readers may re-enter an rw-lock they already share.
        let reentrant_read = meta.kind() == LockKind::ReaderWriter && holder.read && read;
        if !reentrant_read {
            report::double_lock(meta, index, &CallerInfo::acquisition(site, None));
            if cfg.exit_on_deadlock {
                std::process::exit(DEADLOCK_EXIT_CODE);
            }
        }
    }

    meta.note_acquired(index, read);

    if routine::count() > 1 {
        routine::with(index, |r| r.on_lock(meta, read, site, &cfg));
    }
}

/// Bookkeeping after the primitive lock was taken.
pub(crate) fn after_acquire(meta: &LockMeta) {
    meta.increment_locked();
}

/// Detector updates after a successful non-blocking acquisition. The
/// holding set is extended but no dependency is recorded: a try-acquire
/// that went through never waited on anyone.
pub(crate) fn after_try_acquire(meta: &Arc<LockMeta>, read: bool) {
    meta.increment_locked();
    detector::ensure_initialized();

    let cfg = config::get();
    if !cfg.periodic_detection && !cfg.comprehensive_detection {
        return;
    }

    let index = routine::ensure_current();
    meta.note_acquired(index, read);

    if routine::count() > 1 {
        routine::with(index, |r| r.on_try_lock(meta, read, &cfg));
    }
}

/// Recorder update preceding the primitive release.
pub(crate) fn before_release(meta: &LockMeta) {
    let cfg = config::get();
    if !cfg.periodic_detection && !cfg.comprehensive_detection {
        return;
    }
    if let Some(index) = routine::try_current() {
        routine::with(index, |r| r.on_unlock(meta));
    }
}

/// Bookkeeping after the primitive release.
pub(crate) fn after_release(meta: &LockMeta) {
    meta.decrement_locked();

    let cfg = config::get();
    if !cfg.periodic_detection && !cfg.comprehensive_detection {
        return;
    }
    if let Some(index) = routine::try_current() {
        meta.note_released(index);
    }
}
