//! # syncnum
//!
//! Mutex-guarded numeric cells with predicate-gated atomic updates.
//!
//! A cell holds one number behind one lock. Every operation, including the
//! conditional ones, runs as a single acquire / test / mutate / release
//! cycle, so concurrent callers never lose updates and never overshoot a
//! threshold they test against.
//!
//! ## Quick Start
//!
//! ```
//! use syncnum::prelude::*;
//! use std::sync::Arc;
//!
//! let cell = Arc::new(SynchronizedCell::new(0.0));
//!
//! let handles: Vec<_> = [50.0, 100.0]
//!     .into_iter()
//!     .map(|delta| {
//!         let cell = Arc::clone(&cell);
//!         spawn_thread(move || {
//!             cell.increment(delta).unwrap();
//!         })
//!     })
//!     .collect::<std::result::Result<_, _>>()?;
//!
//! for h in handles {
//!     h.join()?;
//! }
//! assert_eq!(*cell, 150.0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Deployment modes
//!
//! | Constructor | Lock | Reach |
//! |-------------|------|-------|
//! | `SynchronizedCell::new(v)` | blocking | threads |
//! | `SynchronizedCell::with_mode(v, mode)` | chosen | threads |
//! | `SynchronizedCell::shared(v, mode)` | chosen | threads + forked processes |
//! | `CellBuilder::new()...build(v)` | configured | configured |
//!
//! ## Errors
//!
//! - [`CellError::LockAcquisition`] - non-blocking cell was contended
//! - [`CellError::Predicate`] - fallible predicate failed
//! - [`CellError::DivisionByZero`] - zero divisor
//! - [`CellError::Overflow`] - integer overflow
//!
//! In every case the value is unchanged and the lock is released.

#![warn(missing_docs)]

mod builder;

pub mod prelude;

pub use builder::{CellBuilder, ConfiguredCell};

pub use syncnum_core::{
    ArithmeticOp, BoxError, CellConfig, CellError, LockMode, Numeric, Result, Sharing,
};

pub use syncnum_concurrency::{
    spawn_thread, AnyBacking, AnyGuard, Backing, ChildExit, InProcessBacking, Join, LaunchError,
    Launcher, SynchronizedCell, ThreadHandle, ThreadLauncher, CHILD_PANIC_EXIT_CODE,
};

#[cfg(unix)]
pub use syncnum_concurrency::{
    spawn_process, ProcessHandle, ProcessLauncher, SharedGuard, SharedMemoryBacking,
};
