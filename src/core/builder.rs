use crate::core::config::{self, Config};
use crate::core::detector;
use crate::core::report::{self, Reporter};
use crate::core::types::DeadlockInfo;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors from [`Interlock::start`].
#[derive(Debug, Error)]
pub enum StartError {
    /// The detector was already started, either explicitly or by the
    /// first tracked lock; the configuration is frozen.
    #[error("deadlock detector is already initialized; configuration is frozen")]
    AlreadyInitialized,
}

/// Builder for configuring and starting the global deadlock detector.
///
/// Locks work without this — the detector starts itself with defaults on
/// first use — but the builder is the place to adjust options and install
/// a callback before anything runs.
///
/// # Example
///
/// ```rust,no_run
/// use interlock::Interlock;
/// use std::time::Duration;
///
/// Interlock::new()
///     .with_periodic_interval(Duration::from_millis(500))
///     .callback(|info| {
///         eprintln!("deadlock involving threads {:?}", info.thread_cycle);
///     })
///     .start()
///     .expect("detector already running");
/// ```
pub struct Interlock {
    config: Config,
    callback: Option<Arc<dyn Fn(DeadlockInfo) + Send + Sync>>,
    reporter: Option<Arc<dyn Reporter>>,
}

impl Default for Interlock {
    fn default() -> Self {
        Interlock::new()
    }
}

impl Interlock {
    /// Start from the current (default) configuration.
    pub fn new() -> Self {
        Interlock {
            config: config::get(),
            callback: None,
            reporter: None,
        }
    }

    /// Enable or disable the periodic background detector.
    pub fn with_periodic_detection(mut self, enabled: bool) -> Self {
        self.config.periodic_detection = enabled;
        self
    }

    /// Enable or disable the end-of-program analysis.
    pub fn with_comprehensive_detection(mut self, enabled: bool) -> Self {
        self.config.comprehensive_detection = enabled;
        self
    }

    /// Interval between periodic detection passes.
    pub fn with_periodic_interval(mut self, interval: Duration) -> Self {
        self.config.periodic_interval = interval;
        self
    }

    /// Capture a call stack for every recorded acquisition.
    pub fn with_call_stacks(mut self, enabled: bool) -> Self {
        self.config.collect_call_stack = enabled;
        self
    }

    /// Record context for acquisitions made while holding nothing else.
    pub fn with_single_level_lock_sites(mut self, enabled: bool) -> Self {
        self.config.collect_single_level_lock_stack = enabled;
        self
    }

    /// Report same-thread re-acquisitions.
    pub fn with_double_lock_check(mut self, enabled: bool) -> Self {
        self.config.check_double_locking = enabled;
        self
    }

    /// Per-thread dependency pool size.
    pub fn with_max_dependencies(mut self, max: usize) -> Self {
        self.config.max_dependencies = max;
        self
    }

    /// Maximum nested holds per thread.
    pub fn with_max_holding_depth(mut self, max: usize) -> Self {
        self.config.max_holding_depth = max;
        self
    }

    /// Maximum number of registered threads.
    pub fn with_max_routines(mut self, max: usize) -> Self {
        self.config.max_routines = max;
        self
    }

    /// Byte budget per captured call stack.
    pub fn with_max_call_stack_size(mut self, bytes: usize) -> Self {
        self.config.max_call_stack_size = bytes;
        self
    }

    /// Whether a confirmed deadlock or double lock terminates the process.
    pub fn with_exit_on_deadlock(mut self, enabled: bool) -> Self {
        self.config.exit_on_deadlock = enabled;
        self
    }

    /// Run the comprehensive analysis before exiting on a confirmed
    /// deadlock.
    pub fn with_comprehensive_on_confirmation(mut self, enabled: bool) -> Self {
        self.config.comprehensive_on_confirmation = enabled;
        self
    }

    /// Install a callback invoked for every deadlock report. It runs on a
    /// dedicated dispatcher thread, so it fires even when the detecting
    /// thread is itself stuck in the reported cycle.
    pub fn callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(DeadlockInfo) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    /// Replace the default stderr report sink.
    pub fn reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Apply the configuration and start the detector.
    pub fn start(self) -> Result<(), StartError> {
        if !config::replace(self.config) {
            return Err(StartError::AlreadyInitialized);
        }
        if let Some(callback) = self.callback {
            report::set_callback_arc(callback);
        }
        if let Some(reporter) = self.reporter {
            report::set_reporter(reporter);
        }
        detector::initialize();
        Ok(())
    }
}
