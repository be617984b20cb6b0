//! SynchronizedCell Test Suite
//!
//! Integration tests for the public cell API.
//!
//! ## Modules
//!
//! - `basic_ops`: get, set, unconditional arithmetic, equality, formatting
//! - `conditional_ops`: predicate-gated and threshold-gated arithmetic
//! - `concurrency`: contention between threads in blocking mode
//! - `non_blocking`: fail-fast acquisition and caller-side retry
//! - `shared_memory`: the same scenarios across forked processes
//! - `launch`: thread and process launchers

pub use std::sync::{Arc, Barrier};
pub use syncnum::prelude::*;

#[cfg(unix)]
mod shared_memory;

/// Repetitions for race-sensitive scenarios on threads
pub const THREAD_TRIALS: usize = 500;

/// Repetitions for race-sensitive scenarios on processes
pub const PROCESS_TRIALS: usize = 25;

/// Install a test-writer subscriber once per binary
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Launch every job, then join them all
pub fn run_all<L, F>(launcher: &L, jobs: Vec<F>)
where
    L: Launcher,
    F: FnOnce() + Send + 'static,
{
    let handles: Vec<_> = jobs
        .into_iter()
        .map(|job| launcher.launch(job).expect("launch failed"))
        .collect();
    for h in handles {
        h.join().expect("launched job failed");
    }
}

/// Build one job per operand, each calling `op(cell, operand)`
pub fn jobs_for<C, T, F>(cell: &Arc<C>, operands: &[T], op: F) -> Vec<Box<dyn FnOnce() + Send>>
where
    C: Send + Sync + 'static,
    T: Copy + Send + 'static,
    F: Fn(&C, T) + Copy + Send + 'static,
{
    operands
        .iter()
        .map(|&operand| {
            let cell = Arc::clone(cell);
            Box::new(move || op(&cell, operand)) as Box<dyn FnOnce() + Send>
        })
        .collect()
}
