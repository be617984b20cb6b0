//! Core types for syncnum
//!
//! This crate defines the pieces every other layer builds on:
//! - [`Numeric`]: the bound on cell values, with checked arithmetic
//! - [`CellError`]: the error taxonomy surfaced by cell operations
//! - [`CellConfig`]: lock mode and sharing selection

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod numeric;

pub use config::{CellConfig, LockMode, Sharing};
pub use error::{BoxError, CellError, Result};
pub use numeric::{ArithmeticOp, Numeric};
