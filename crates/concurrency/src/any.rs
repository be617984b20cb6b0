//! Runtime-selected backing
//!
//! [`AnyBacking`] lets configuration decide the storage strategy. The branch
//! on sharing happens here, once per lock call, and nowhere in the cell.

use crate::backing::{Backing, InProcessBacking};
#[cfg(unix)]
use crate::shared::{SharedGuard, SharedMemoryBacking};
use parking_lot::MutexGuard;
use std::ops::{Deref, DerefMut};
use syncnum_core::{Numeric, Result, Sharing};

/// Either storage strategy, chosen from a [`Sharing`] value
pub enum AnyBacking<T> {
    /// Process-local mutex
    InProcess(InProcessBacking<T>),
    /// Shared-memory mutex visible to forked children
    #[cfg(unix)]
    CrossProcess(SharedMemoryBacking<T>),
}

impl<T: Numeric> AnyBacking<T> {
    /// Create storage for `initial` with the requested scope
    ///
    /// Fails with `CellError::SharedMemory` if the shared region cannot be
    /// mapped, or if cross-process storage is unsupported on this platform.
    pub fn new(initial: T, sharing: Sharing) -> Result<Self> {
        match sharing {
            Sharing::InProcess => Ok(AnyBacking::InProcess(InProcessBacking::new(initial))),
            #[cfg(unix)]
            Sharing::CrossProcess => Ok(AnyBacking::CrossProcess(SharedMemoryBacking::new(
                initial,
            )?)),
            #[cfg(not(unix))]
            Sharing::CrossProcess => Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "cross-process cells require a unix platform",
            )
            .into()),
        }
    }
}

/// Guard returned by [`AnyBacking`]
pub enum AnyGuard<'a, T> {
    /// Guard over the process-local mutex
    InProcess(MutexGuard<'a, T>),
    /// Guard over the shared-memory mutex
    #[cfg(unix)]
    CrossProcess(SharedGuard<'a, T>),
}

impl<T> Deref for AnyGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self {
            AnyGuard::InProcess(g) => &**g,
            #[cfg(unix)]
            AnyGuard::CrossProcess(g) => &**g,
        }
    }
}

impl<T> DerefMut for AnyGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        match self {
            AnyGuard::InProcess(g) => &mut **g,
            #[cfg(unix)]
            AnyGuard::CrossProcess(g) => &mut **g,
        }
    }
}

impl<T: Numeric> Backing<T> for AnyBacking<T> {
    type Guard<'a> = AnyGuard<'a, T>
    where
        Self: 'a;

    fn lock(&self) -> AnyGuard<'_, T> {
        match self {
            AnyBacking::InProcess(b) => AnyGuard::InProcess(b.lock()),
            #[cfg(unix)]
            AnyBacking::CrossProcess(b) => AnyGuard::CrossProcess(b.lock()),
        }
    }

    fn try_lock(&self) -> Option<AnyGuard<'_, T>> {
        match self {
            AnyBacking::InProcess(b) => b.try_lock().map(AnyGuard::InProcess),
            #[cfg(unix)]
            AnyBacking::CrossProcess(b) => b.try_lock().map(AnyGuard::CrossProcess),
        }
    }

    fn is_locked(&self) -> bool {
        match self {
            AnyBacking::InProcess(b) => b.is_locked(),
            #[cfg(unix)]
            AnyBacking::CrossProcess(b) => b.is_locked(),
        }
    }

    fn sharing(&self) -> Sharing {
        match self {
            AnyBacking::InProcess(b) => b.sharing(),
            #[cfg(unix)]
            AnyBacking::CrossProcess(b) => b.sharing(),
        }
    }
}
