//! Cell configuration
//!
//! A cell's behaviour is fixed at construction by two independent choices:
//!
//! - [`LockMode`]: whether lock acquisition waits or fails immediately
//! - [`Sharing`]: whether the value and lock live in process memory or in
//!   memory shared with forked child processes
//!
//! Both default to the conservative choice (blocking, in-process), so an
//! empty configuration document yields a plain thread-safe cell.

use serde::{Deserialize, Serialize};

/// Lock acquisition behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    /// Wait indefinitely for the lock
    #[default]
    Blocking,
    /// Try once; fail with `CellError::LockAcquisition` on contention
    NonBlocking,
}

impl LockMode {
    /// Map the `blocking` flag onto a lock mode.
    pub fn from_blocking(blocking: bool) -> Self {
        if blocking {
            LockMode::Blocking
        } else {
            LockMode::NonBlocking
        }
    }

    /// Check if acquisition waits for the lock.
    pub fn is_blocking(self) -> bool {
        matches!(self, LockMode::Blocking)
    }
}

/// Reachability scope of a cell's storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sharing {
    /// Value and lock live in this process only
    #[default]
    InProcess,
    /// Value and lock live in shared memory inherited by child processes
    CrossProcess,
}

impl Sharing {
    /// Map the `shared` flag onto a sharing scope.
    pub fn from_shared(shared: bool) -> Self {
        if shared {
            Sharing::CrossProcess
        } else {
            Sharing::InProcess
        }
    }

    /// Check if the cell is visible across processes.
    pub fn is_shared(self) -> bool {
        matches!(self, Sharing::CrossProcess)
    }
}

/// Construction-time configuration for a cell
///
/// # Example
///
/// ```
/// use syncnum_core::{CellConfig, LockMode, Sharing};
///
/// let config: CellConfig = serde_json::from_str(r#"{"lock_mode": "non_blocking"}"#).unwrap();
/// assert_eq!(config.lock_mode, LockMode::NonBlocking);
/// assert_eq!(config.sharing, Sharing::InProcess);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CellConfig {
    /// Lock acquisition behaviour
    pub lock_mode: LockMode,
    /// Storage scope
    pub sharing: Sharing,
}

impl CellConfig {
    /// Build a configuration from the `blocking` and `shared` flags.
    pub fn new(blocking: bool, shared: bool) -> Self {
        Self {
            lock_mode: LockMode::from_blocking(blocking),
            sharing: Sharing::from_shared(shared),
        }
    }

    /// Set the lock mode
    pub fn with_lock_mode(mut self, lock_mode: LockMode) -> Self {
        self.lock_mode = lock_mode;
        self
    }

    /// Set the sharing scope
    pub fn with_sharing(mut self, sharing: Sharing) -> Self {
        self.sharing = sharing;
        self
    }

    /// Check if acquisition waits for the lock.
    pub fn is_blocking(&self) -> bool {
        self.lock_mode.is_blocking()
    }

    /// Check if the cell is visible across processes.
    pub fn is_shared(&self) -> bool {
        self.sharing.is_shared()
    }
}
