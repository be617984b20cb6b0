//! Concurrency layer for syncnum
//!
//! This crate implements the mutex-guarded numeric cell:
//! - Backing: lock + value storage strategy (in-process or shared memory)
//! - SynchronizedCell: predicate-gated test-then-mutate under one lock
//! - Launchers: run a closure on a new thread or a forked process
//!
//! Every cell operation acquires the lock once, does all of its reading,
//! predicate evaluation and writing under it, and releases it when the guard
//! goes out of scope. Errors and panics release the lock the same way.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod any;
pub mod backing;
pub mod cell;
pub mod launch;
#[cfg(unix)]
pub mod shared;

pub use any::{AnyBacking, AnyGuard};
pub use backing::{Backing, InProcessBacking};
pub use cell::SynchronizedCell;
#[cfg(unix)]
pub use launch::{spawn_process, ProcessHandle, ProcessLauncher};
pub use launch::{
    spawn_thread, ChildExit, Join, LaunchError, Launcher, ThreadHandle, ThreadLauncher,
    CHILD_PANIC_EXIT_CODE,
};
#[cfg(unix)]
pub use shared::{SharedGuard, SharedMemoryBacking};

// Re-export the core types for convenience
pub use syncnum_core::{CellConfig, CellError, LockMode, Numeric, Result, Sharing};
