//! Mutex-guarded numeric cell
//!
//! [`SynchronizedCell`] holds one numeric value behind one lock and exposes
//! unconditional and predicate-gated arithmetic on it.
//!
//! ## Test-then-mutate protocol
//!
//! ```text
//! 1. Reject a zero divisor (division only) - nothing acquired yet
//! 2. acquire() - wait (blocking) or fail with LockAcquisition (non-blocking)
//! 3. Evaluate predicate(current) - error or panic: release, value unchanged
//! 4. IF false: release, return Ok(false)
//! 5. Compute current <op> operand - overflow: release, value unchanged
//! 6. Write, release, return Ok(true)
//! ```
//!
//! Steps 2-6 run under a single guard, so no other operation on the same cell
//! can observe or interleave with the intermediate state. Release is bound to
//! the guard's lifetime and happens on every exit path, including unwinding.
//!
//! ## Lock modes
//!
//! Mutators honour the cell's [`LockMode`]. The plain accessors (`get`,
//! equality, `Display`) always block; [`SynchronizedCell::try_get`] is the
//! accessor that honours the lock mode.
//!
//! The lock is not re-entrant: calling back into the same cell from inside a
//! predicate deadlocks in blocking mode.

use crate::any::AnyBacking;
use crate::backing::{Backing, InProcessBacking};
#[cfg(unix)]
use crate::shared::SharedMemoryBacking;
use std::fmt;
use std::marker::PhantomData;
use syncnum_core::{ArithmeticOp, BoxError, CellConfig, CellError, LockMode, Numeric, Result, Sharing};
use tracing::{debug, trace};

/// A numeric value guarded by a single mutual-exclusion lock
///
/// Share a cell between threads with `Arc`. Share it between processes by
/// constructing it with cross-process storage ([`SynchronizedCell::shared`])
/// before forking; a cell with in-process storage copied into a child process
/// becomes an independent, unsynchronized copy.
///
/// # Example
///
/// ```
/// use syncnum_concurrency::SynchronizedCell;
///
/// let cell = SynchronizedCell::new(0);
/// assert!(cell.increment_if_less_than(100, 100, false)?);
/// assert!(!cell.increment_if_less_than(100, 100, false)?);
/// assert_eq!(cell, 100);
/// # Ok::<(), syncnum_concurrency::CellError>(())
/// ```
pub struct SynchronizedCell<T, B = InProcessBacking<T>> {
    backing: B,
    lock_mode: LockMode,
    _value: PhantomData<fn() -> T>,
}

impl<T: Numeric> SynchronizedCell<T> {
    /// Create a blocking, in-process cell
    pub fn new(initial: T) -> Self {
        Self::with_mode(initial, LockMode::Blocking)
    }

    /// Create an in-process cell with the given lock mode
    pub fn with_mode(initial: T, lock_mode: LockMode) -> Self {
        Self::from_backing(InProcessBacking::new(initial), lock_mode)
    }
}

impl<T: Numeric> Default for SynchronizedCell<T> {
    fn default() -> Self {
        Self::new(T::zero())
    }
}

#[cfg(unix)]
impl<T: Numeric> SynchronizedCell<T, SharedMemoryBacking<T>> {
    /// Create a cell in shared memory, visible to processes forked afterwards
    pub fn shared(initial: T, lock_mode: LockMode) -> Result<Self> {
        let backing = SharedMemoryBacking::new(initial)?;
        Ok(Self::from_backing(backing, lock_mode))
    }
}

impl<T: Numeric> SynchronizedCell<T, AnyBacking<T>> {
    /// Create a cell whose storage is chosen by `config`
    ///
    /// ```
    /// use syncnum_concurrency::{CellConfig, SynchronizedCell};
    ///
    /// let cell = SynchronizedCell::from_config(1.5, &CellConfig::new(false, false))?;
    /// assert!(!cell.lock_mode().is_blocking());
    /// # Ok::<(), syncnum_concurrency::CellError>(())
    /// ```
    pub fn from_config(initial: T, config: &CellConfig) -> Result<Self> {
        let backing = AnyBacking::new(initial, config.sharing)?;
        Ok(Self::from_backing(backing, config.lock_mode))
    }
}

impl<T: Numeric, B: Backing<T>> SynchronizedCell<T, B> {
    /// Wrap an existing backing
    pub fn from_backing(backing: B, lock_mode: LockMode) -> Self {
        Self {
            backing,
            lock_mode,
            _value: PhantomData,
        }
    }

    /// Lock mode fixed at construction
    pub fn lock_mode(&self) -> LockMode {
        self.lock_mode
    }

    /// Storage scope fixed at construction
    pub fn sharing(&self) -> Sharing {
        self.backing.sharing()
    }

    /// Check whether the lock is currently held
    pub fn is_locked(&self) -> bool {
        self.backing.is_locked()
    }

    /// Underlying storage
    pub fn backing(&self) -> &B {
        &self.backing
    }

    fn acquire(&self) -> Result<B::Guard<'_>> {
        match self.lock_mode {
            LockMode::Blocking => Ok(self.backing.lock()),
            LockMode::NonBlocking => self.backing.try_lock().ok_or_else(|| {
                trace!(sharing = ?self.backing.sharing(), "cell busy, non-blocking acquire failed");
                CellError::LockAcquisition
            }),
        }
    }

    fn apply_if<P>(&self, op: ArithmeticOp, operand: T, predicate: P) -> Result<bool>
    where
        P: FnOnce(T) -> Result<bool>,
    {
        if op == ArithmeticOp::Div && operand.is_zero() {
            return Err(CellError::DivisionByZero);
        }

        let mut guard = self.acquire()?;
        let current = *guard;
        if !predicate(current)? {
            return Ok(false);
        }

        let next = op.apply(current, operand).ok_or_else(|| {
            debug!(%op, value = %current, %operand, "cell update would overflow");
            CellError::overflow(op, current, operand)
        })?;
        *guard = next;
        Ok(true)
    }

    // =========================================================================
    // Value access
    // =========================================================================

    /// Read the current value
    ///
    /// Always waits for the lock, whatever the cell's lock mode.
    pub fn get(&self) -> T {
        *self.backing.lock()
    }

    /// Read the current value, honouring the cell's lock mode
    pub fn try_get(&self) -> Result<T> {
        Ok(*self.acquire()?)
    }

    /// Replace the current value
    pub fn set(&self, value: T) -> Result<()> {
        *self.acquire()? = value;
        Ok(())
    }

    /// Apply `f` to the current value atomically and store the result
    ///
    /// Returns the new value.
    pub fn update<F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(T) -> T,
    {
        let mut guard = self.acquire()?;
        *guard = f(*guard);
        Ok(*guard)
    }

    // =========================================================================
    // Unconditional arithmetic
    // =========================================================================

    /// Add `delta` to the value
    pub fn increment(&self, delta: T) -> Result<bool> {
        self.increment_if(delta, |_| true)
    }

    /// Subtract `delta` from the value
    pub fn decrement(&self, delta: T) -> Result<bool> {
        self.decrement_if(delta, |_| true)
    }

    /// Multiply the value by `factor`
    pub fn multiply(&self, factor: T) -> Result<bool> {
        self.multiply_if(factor, |_| true)
    }

    /// Divide the value by `divisor`
    ///
    /// Fails with [`CellError::DivisionByZero`] for a zero divisor.
    pub fn divide(&self, divisor: T) -> Result<bool> {
        self.divide_if(divisor, |_| true)
    }

    // =========================================================================
    // Threshold-gated arithmetic
    // =========================================================================

    /// Add `delta` only if the value is below `limit` (or equal, with `eq_ok`)
    pub fn increment_if_less_than(&self, delta: T, limit: T, eq_ok: bool) -> Result<bool> {
        self.increment_if(delta, move |value| value < limit || (eq_ok && value == limit))
    }

    /// Subtract `delta` only if the value is above `limit` (or equal, with `eq_ok`)
    pub fn decrement_if_greater_than(&self, delta: T, limit: T, eq_ok: bool) -> Result<bool> {
        self.decrement_if(delta, move |value| value > limit || (eq_ok && value == limit))
    }

    // =========================================================================
    // Predicate-gated arithmetic
    // =========================================================================

    /// Add `delta` if `predicate(current)` holds
    ///
    /// Returns whether the value was changed.
    pub fn increment_if<P>(&self, delta: T, predicate: P) -> Result<bool>
    where
        P: FnOnce(T) -> bool,
    {
        self.apply_if(ArithmeticOp::Add, delta, |v| Ok(predicate(v)))
    }

    /// Subtract `delta` if `predicate(current)` holds
    pub fn decrement_if<P>(&self, delta: T, predicate: P) -> Result<bool>
    where
        P: FnOnce(T) -> bool,
    {
        self.apply_if(ArithmeticOp::Sub, delta, |v| Ok(predicate(v)))
    }

    /// Multiply by `factor` if `predicate(current)` holds
    pub fn multiply_if<P>(&self, factor: T, predicate: P) -> Result<bool>
    where
        P: FnOnce(T) -> bool,
    {
        self.apply_if(ArithmeticOp::Mul, factor, |v| Ok(predicate(v)))
    }

    /// Divide by `divisor` if `predicate(current)` holds
    ///
    /// A zero divisor fails with [`CellError::DivisionByZero`] before the
    /// predicate runs.
    pub fn divide_if<P>(&self, divisor: T, predicate: P) -> Result<bool>
    where
        P: FnOnce(T) -> bool,
    {
        self.apply_if(ArithmeticOp::Div, divisor, |v| Ok(predicate(v)))
    }

    /// Add `delta` if the fallible `predicate(current)` returns `Ok(true)`
    ///
    /// A predicate error is returned as [`CellError::Predicate`] after the
    /// lock is released, with the value unchanged.
    pub fn try_increment_if<P, E>(&self, delta: T, predicate: P) -> Result<bool>
    where
        P: FnOnce(T) -> std::result::Result<bool, E>,
        E: Into<BoxError>,
    {
        self.apply_if(ArithmeticOp::Add, delta, checked(predicate))
    }

    /// Subtract `delta` if the fallible `predicate(current)` returns `Ok(true)`
    pub fn try_decrement_if<P, E>(&self, delta: T, predicate: P) -> Result<bool>
    where
        P: FnOnce(T) -> std::result::Result<bool, E>,
        E: Into<BoxError>,
    {
        self.apply_if(ArithmeticOp::Sub, delta, checked(predicate))
    }

    /// Multiply by `factor` if the fallible `predicate(current)` returns `Ok(true)`
    pub fn try_multiply_if<P, E>(&self, factor: T, predicate: P) -> Result<bool>
    where
        P: FnOnce(T) -> std::result::Result<bool, E>,
        E: Into<BoxError>,
    {
        self.apply_if(ArithmeticOp::Mul, factor, checked(predicate))
    }

    /// Divide by `divisor` if the fallible `predicate(current)` returns `Ok(true)`
    pub fn try_divide_if<P, E>(&self, divisor: T, predicate: P) -> Result<bool>
    where
        P: FnOnce(T) -> std::result::Result<bool, E>,
        E: Into<BoxError>,
    {
        self.apply_if(ArithmeticOp::Div, divisor, checked(predicate))
    }
}

fn checked<T, P, E>(predicate: P) -> impl FnOnce(T) -> Result<bool>
where
    T: Numeric,
    P: FnOnce(T) -> std::result::Result<bool, E>,
    E: Into<BoxError>,
{
    move |value| {
        predicate(value).map_err(|e| {
            let err = CellError::predicate(e);
            debug!(%value, error = %err, "cell predicate failed");
            err
        })
    }
}

// =============================================================================
// Equality and formatting
// =============================================================================

impl<T, B, C> PartialEq<SynchronizedCell<T, C>> for SynchronizedCell<T, B>
where
    T: Numeric,
    B: Backing<T>,
    C: Backing<T>,
{
    /// Cells are equal when their current values are equal.
    ///
    /// Each side is read under its own lock in turn, so comparing a cell with
    /// itself cannot deadlock.
    fn eq(&self, other: &SynchronizedCell<T, C>) -> bool {
        self.get() == other.get()
    }
}

macro_rules! impl_bare_eq {
    ($($t:ty),* $(,)?) => {
        $(
            impl<B: Backing<$t>> PartialEq<$t> for SynchronizedCell<$t, B> {
                fn eq(&self, other: &$t) -> bool {
                    self.get() == *other
                }
            }

            impl<B: Backing<$t>> PartialEq<SynchronizedCell<$t, B>> for $t {
                fn eq(&self, other: &SynchronizedCell<$t, B>) -> bool {
                    *self == other.get()
                }
            }
        )*
    };
}

impl_bare_eq!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

impl<T: Numeric, B: Backing<T>> fmt::Display for SynchronizedCell<T, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.get(), f)
    }
}

impl<T: Numeric, B: Backing<T>> fmt::Debug for SynchronizedCell<T, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        struct LockedPlaceholder;

        impl fmt::Debug for LockedPlaceholder {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("<locked>")
            }
        }

        let mut d = f.debug_struct("SynchronizedCell");
        match self.backing.try_lock() {
            Some(guard) => d.field("value", &*guard),
            None => d.field("value", &LockedPlaceholder),
        };
        d.field("lock_mode", &self.lock_mode)
            .field("sharing", &self.backing.sharing())
            .finish()
    }
}
