//! Builder for configured cells.
//!
//! The builder collects a [`CellConfig`] and produces a cell whose storage is
//! selected at runtime. Use it when the lock mode or sharing scope comes from
//! configuration rather than from code.

use syncnum_concurrency::{AnyBacking, SynchronizedCell};
use syncnum_core::{CellConfig, LockMode, Numeric, Result, Sharing};
use tracing::debug;

/// Cell produced by [`CellBuilder`]: storage chosen at runtime
pub type ConfiguredCell<T> = SynchronizedCell<T, AnyBacking<T>>;

/// Builder for cell configuration.
///
/// # Example
///
/// ```
/// use syncnum::{CellBuilder, CellError};
///
/// // Threads only, fail fast on contention
/// let cell = CellBuilder::new().non_blocking().build(10i64)?;
/// assert!(cell.decrement_if_greater_than(5, 0, false)?);
///
/// // Shared with forked child processes
/// # #[cfg(unix)]
/// # {
/// let shared = CellBuilder::new().shared().build(0.0f64)?;
/// assert!(shared.sharing().is_shared());
/// # }
/// # Ok::<(), CellError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct CellBuilder {
    config: CellConfig,
}

impl CellBuilder {
    /// Create a builder with default settings (blocking, in-process).
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn from_config(config: CellConfig) -> Self {
        Self { config }
    }

    /// Wait for the lock (default).
    pub fn blocking(mut self) -> Self {
        self.config.lock_mode = LockMode::Blocking;
        self
    }

    /// Fail immediately with `CellError::LockAcquisition` on contention.
    pub fn non_blocking(mut self) -> Self {
        self.config.lock_mode = LockMode::NonBlocking;
        self
    }

    /// Keep storage in this process (default).
    pub fn in_process(mut self) -> Self {
        self.config.sharing = Sharing::InProcess;
        self
    }

    /// Place storage in memory shared with forked child processes.
    pub fn shared(mut self) -> Self {
        self.config.sharing = Sharing::CrossProcess;
        self
    }

    /// Configuration collected so far.
    pub fn config(&self) -> &CellConfig {
        &self.config
    }

    /// Build a cell holding `initial`.
    ///
    /// Fails only if shared storage was requested and cannot be mapped.
    pub fn build<T: Numeric>(self, initial: T) -> Result<ConfiguredCell<T>> {
        debug!(config = ?self.config, %initial, "building cell");
        SynchronizedCell::from_config(initial, &self.config)
    }
}
