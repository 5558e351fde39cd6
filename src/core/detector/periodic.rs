//! Timer-driven detection of live deadlocks.
//!
//! A background thread observes, on every tick, the innermost lock each
//! registered thread currently holds. When at least two threads hold more
//! than one lock and something moved since the previous tick, the current
//! dependencies are searched for a cycle. A found cycle is only a
//! confirmed deadlock if every thread in it still holds what the tick
//! observed — a thread mid-flight between a release and the next acquire
//! makes the cycle unstable and the search goes on. The state is read
//! through the per-routine mutexes in short, bounded sections; no lock is
//! held across the whole pass.

use crate::core::config;
use crate::core::dependency::{DepRef, DepStack, Dependency};
use crate::core::detector::{chain, comprehensive};
use crate::core::report;
use crate::core::routine::{self, Routine};
use crate::core::types::{DEADLOCK_EXIT_CODE, LockId};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

type Handles = [Arc<Mutex<Routine>>];

/// Launch the periodic detection task. Runs for the process lifetime.
pub(crate) fn spawn(interval: Duration) {
    std::thread::spawn(move || {
        let ticker = crossbeam_channel::tick(interval);
        let mut last_holding: Vec<Option<LockId>> = Vec::new();
        while ticker.recv().is_ok() {
            tick(&mut last_holding);
        }
    });
}

/// The current dependency of one routine at tick time.
struct Current {
    dep: Option<(usize, Dependency)>,
}

fn tick(last_holding: &mut Vec<Option<LockId>>) {
    let handles = routine::handles();
    if handles.len() < 2 {
        return;
    }
    if last_holding.len() < handles.len() {
        last_holding.resize(handles.len(), None);
    }

    let mut changed = false;
    let mut candidates = 0;
    let mut currents = Vec::with_capacity(handles.len());
    for (index, handle) in handles.iter().enumerate() {
        let (innermost, holds, dep) = {
            let guard = handle.lock();
            (
                guard.innermost(),
                guard.holding_count(),
                guard.current_dependency(),
            )
        };
        if innermost != last_holding[index] {
            last_holding[index] = innermost;
            changed = true;
        }
        if holds > 1 {
            candidates += 1;
        }
        currents.push(Current { dep });
    }

    // A deadlock needs at least two threads nested in their holds, and a
    // tick where nothing moved has nothing new to say.
    if !changed || candidates < 2 {
        return;
    }

    analyze(&handles, &currents, last_holding);
}

fn analyze(handles: &Handles, currents: &[Current], last_holding: &[Option<LockId>]) {
    let mut stack = DepStack::new();
    let mut traversed = vec![false; currents.len()];
    for (index, current) in currents.iter().enumerate() {
        let Some((slot, dep)) = current.dep.clone() else {
            continue;
        };
        traversed[index] = true;
        stack.push(DepRef {
            routine: index,
            slot,
            dep,
        });
        dfs(&mut stack, index, &mut traversed, currents, handles, last_holding);
        stack.pop();
        handles[index].lock().clear_current_dependency();
    }
}

fn dfs(
    stack: &mut DepStack,
    visiting: usize,
    traversed: &mut [bool],
    currents: &[Current],
    handles: &Handles,
    last_holding: &[Option<LockId>],
) {
    for index in (visiting + 1)..currents.len() {
        if traversed[index] {
            continue;
        }
        let Some((slot, dep)) = currents[index].dep.clone() else {
            continue;
        };
        let cand = DepRef {
            routine: index,
            slot,
            dep,
        };
        if !chain::is_chain(stack, &cand) {
            continue;
        }
        if chain::is_cycle_chain(stack, &cand) {
            stack.push(cand);
            // Stability: every thread of the cycle must still hold what
            // this tick observed.
            let stable = stack.entries().iter().all(|entry| {
                handles[entry.routine].lock().innermost() == last_holding[entry.routine]
            });
            if stable {
                confirm(stack);
            }
            stack.pop();
        } else {
            traversed[index] = true;
            stack.push(cand);
            dfs(stack, visiting, traversed, currents, handles, last_holding);
            stack.pop();
            traversed[index] = false;
        }
    }
}

fn confirm(stack: &DepStack) {
    report::confirmed_deadlock(stack);
    let cfg = config::get();
    if cfg.comprehensive_on_confirmation {
        comprehensive::run();
    }
    if cfg.exit_on_deadlock {
        std::process::exit(DEADLOCK_EXIT_CODE);
    }
}
