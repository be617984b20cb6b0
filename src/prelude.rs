//! Convenient imports for syncnum.
//!
//! This module re-exports the most commonly used types so you can get started
//! with a single import:
//!
//! ```
//! use syncnum::prelude::*;
//!
//! let cell = SynchronizedCell::new(51.0);
//! cell.increment_if(40.0, |x| 50.0 < x && x < 100.0)?;
//! # Ok::<(), CellError>(())
//! ```

// Cells
pub use crate::builder::{CellBuilder, ConfiguredCell};
pub use syncnum_concurrency::{Backing, SynchronizedCell};

// Configuration
pub use syncnum_core::{CellConfig, LockMode, Sharing};

// Error handling
pub use syncnum_core::{CellError, Result};

// Value types
pub use syncnum_core::Numeric;

// Launchers
pub use syncnum_concurrency::{spawn_thread, Join, LaunchError, Launcher, ThreadLauncher};
#[cfg(unix)]
pub use syncnum_concurrency::{spawn_process, ProcessLauncher};
