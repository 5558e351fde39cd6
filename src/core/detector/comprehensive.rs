//! End-of-program lock-order analysis.
//!
//! Depth-first search across every thread's recorded dependencies,
//! assembling chains with [`chain::is_chain`] and reporting each chain
//! that closes into a cycle. Starting threads are taken in index order and
//! the search only ever walks to higher indices, so a cycle over threads
//! {A, B, C} is found exactly once rather than once per rotation.

use crate::core::dependency::{DepRef, DepStack, Dependency};
use crate::core::detector::chain;
use crate::core::report;
use crate::core::routine;
use fxhash::FxHashSet;

/// Run the analysis over a snapshot of all recorded dependencies.
pub(crate) fn run() {
    let handles = routine::handles();
    if handles.len() < 2 {
        return;
    }

    let pools: Vec<Vec<Dependency>> = handles
        .iter()
        .map(|handle| handle.lock().dependencies().to_vec())
        .collect();

    // A cycle needs at least two distinct dependencies globally.
    let mut shapes = FxHashSet::default();
    for pool in &pools {
        for dep in pool {
            shapes.insert(dep.shape());
        }
    }
    if shapes.len() < 2 {
        return;
    }

    tracing::debug!(
        threads = pools.len(),
        dependencies = shapes.len(),
        "running comprehensive lock-order analysis"
    );

    let mut stack = DepStack::new();
    let mut traversed = vec![false; pools.len()];
    for (index, pool) in pools.iter().enumerate() {
        for (slot, dep) in pool.iter().enumerate() {
            traversed[index] = true;
            stack.push(DepRef {
                routine: index,
                slot,
                dep: dep.clone(),
            });
            dfs(&mut stack, index, &mut traversed, &pools);
            stack.pop();
            traversed[index] = false;
        }
    }
}

fn dfs(stack: &mut DepStack, visiting: usize, traversed: &mut [bool], pools: &[Vec<Dependency>]) {
    for index in (visiting + 1)..pools.len() {
        if traversed[index] {
            continue;
        }
        for (slot, dep) in pools[index].iter().enumerate() {
            let cand = DepRef {
                routine: index,
                slot,
                dep: dep.clone(),
            };
            if !chain::is_chain(stack, &cand) {
                continue;
            }
            if chain::is_cycle_chain(stack, &cand) {
                stack.push(cand);
                report::potential_deadlock(stack);
                stack.pop();
            } else {
                traversed[index] = true;
                stack.push(cand);
                dfs(stack, visiting, traversed, pools);
                stack.pop();
                traversed[index] = false;
            }
        }
    }
}
