//! Error types for cell operations
//!
//! Every failure is surfaced synchronously to the caller of the operation.
//! None are retried internally. The only thing guaranteed to happen on every
//! failure path is that the cell's lock is released.
//!
//! ## Taxonomy
//!
//! | Variant | Raised when | Value changed |
//! |---------|-------------|---------------|
//! | LockAcquisition | non-blocking acquire found the lock held | no |
//! | Predicate | a fallible predicate returned an error | no |
//! | DivisionByZero | divisor is zero | no |
//! | Overflow | integer arithmetic would overflow | no |
//! | SharedMemory | cross-process region could not be set up | n/a |

use crate::numeric::ArithmeticOp;
use thiserror::Error;

/// Boxed error returned by a fallible predicate.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// All cell errors.
#[derive(Debug, Error)]
pub enum CellError {
    /// Non-blocking acquire found the lock held by another context
    #[error("lock acquisition failed: cell is held by another context")]
    LockAcquisition,

    /// The caller-supplied predicate failed during evaluation
    #[error("predicate failed: {0}")]
    Predicate(#[source] BoxError),

    /// Division by a zero divisor
    #[error("division by zero")]
    DivisionByZero,

    /// Integer arithmetic would overflow the value type
    #[error("arithmetic overflow: {value} {op} {operand}")]
    Overflow {
        /// Operation that overflowed
        op: ArithmeticOp,
        /// Current value of the cell
        value: String,
        /// Operand supplied by the caller
        operand: String,
    },

    /// Allocating or initialising cross-process storage failed
    #[error("shared memory error: {0}")]
    SharedMemory(#[from] std::io::Error),
}

/// Result type for cell operations.
pub type Result<T> = std::result::Result<T, CellError>;

impl CellError {
    /// Wrap a predicate error.
    pub fn predicate(err: impl Into<BoxError>) -> Self {
        CellError::Predicate(err.into())
    }

    /// Build an overflow error from the offending operands.
    pub fn overflow(op: ArithmeticOp, value: impl ToString, operand: impl ToString) -> Self {
        CellError::Overflow {
            op,
            value: value.to_string(),
            operand: operand.to_string(),
        }
    }

    /// Check if this error was caused by lock contention.
    pub fn is_contention(&self) -> bool {
        matches!(self, CellError::LockAcquisition)
    }

    /// Check if this error is retryable.
    ///
    /// Only contention is transient; every other failure would repeat
    /// with the same inputs.
    pub fn is_retryable(&self) -> bool {
        self.is_contention()
    }

    /// Check if this error came from the caller's predicate.
    pub fn is_predicate(&self) -> bool {
        matches!(self, CellError::Predicate(_))
    }
}
