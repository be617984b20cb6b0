//! Storage strategies for cell values
//!
//! A [`Backing`] owns one value and the one lock guarding it. Cells are
//! generic over the backing, so the choice between in-process and
//! cross-process storage is made once at construction instead of being
//! branched on inside every operation.
//!
//! ## Guard contract
//!
//! `lock()` and `try_lock()` hand out a guard that dereferences to the value.
//! The lock is held exactly as long as the guard lives and is released in the
//! guard's `Drop`, which also runs while unwinding from a panic.

use parking_lot::{Mutex, MutexGuard};
use std::ops::DerefMut;
use syncnum_core::{Numeric, Sharing};

/// Lock and value storage for a cell
pub trait Backing<T: Numeric>: Send + Sync {
    /// Scoped lock guard; releases the lock on drop
    type Guard<'a>: DerefMut<Target = T>
    where
        Self: 'a;

    /// Acquire the lock, waiting as long as necessary
    fn lock(&self) -> Self::Guard<'_>;

    /// Attempt the lock once without waiting
    ///
    /// Returns `None` if the lock is held elsewhere.
    fn try_lock(&self) -> Option<Self::Guard<'_>>;

    /// Check whether the lock is currently held
    ///
    /// The answer may be stale by the time it is returned; use it for
    /// diagnostics and tests, not for synchronization.
    fn is_locked(&self) -> bool;

    /// Reachability scope of this storage
    fn sharing(&self) -> Sharing;
}

/// In-process storage: a `parking_lot` mutex around the value
///
/// `parking_lot` mutexes do not poison, so a panic inside a critical section
/// leaves the cell usable with its last committed value.
pub struct InProcessBacking<T> {
    value: Mutex<T>,
}

impl<T: Numeric> InProcessBacking<T> {
    /// Create storage holding `initial`
    pub fn new(initial: T) -> Self {
        Self {
            value: Mutex::new(initial),
        }
    }
}

impl<T: Numeric> Backing<T> for InProcessBacking<T> {
    type Guard<'a> = MutexGuard<'a, T>
    where
        Self: 'a;

    #[inline]
    fn lock(&self) -> MutexGuard<'_, T> {
        self.value.lock()
    }

    #[inline]
    fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        self.value.try_lock()
    }

    fn is_locked(&self) -> bool {
        self.value.is_locked()
    }

    fn sharing(&self) -> Sharing {
        Sharing::InProcess
    }
}
