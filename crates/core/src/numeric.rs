//! Numeric value types
//!
//! A cell holds one value of a type implementing [`Numeric`]. The trait is
//! implemented for every primitive integer and float type.
//!
//! All mutation steps go through the checked operations so that integer
//! overflow surfaces as an error instead of wrapping or panicking while the
//! cell's lock is held. Floats follow IEEE semantics and never fail here.

use num_traits::Num;
use std::fmt;

/// Arithmetic operation applied by a mutation step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOp {
    /// Addition (increment)
    Add,
    /// Subtraction (decrement)
    Sub,
    /// Multiplication
    Mul,
    /// Division
    Div,
}

impl ArithmeticOp {
    /// Apply this operation to `lhs` and `rhs` with overflow checking.
    pub fn apply<T: Numeric>(self, lhs: T, rhs: T) -> Option<T> {
        match self {
            ArithmeticOp::Add => lhs.checked_add_value(rhs),
            ArithmeticOp::Sub => lhs.checked_sub_value(rhs),
            ArithmeticOp::Mul => lhs.checked_mul_value(rhs),
            ArithmeticOp::Div => lhs.checked_div_value(rhs),
        }
    }
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Sub => "-",
            ArithmeticOp::Mul => "*",
            ArithmeticOp::Div => "/",
        };
        f.write_str(symbol)
    }
}

/// A value type that can live in a synchronized cell.
///
/// Values are `Copy` plain data: cross-process cells store them directly in
/// shared memory, so they must not own heap allocations.
pub trait Numeric:
    Num + Copy + PartialOrd + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// `self + rhs`, or `None` on overflow
    fn checked_add_value(self, rhs: Self) -> Option<Self>;

    /// `self - rhs`, or `None` on overflow
    fn checked_sub_value(self, rhs: Self) -> Option<Self>;

    /// `self * rhs`, or `None` on overflow
    fn checked_mul_value(self, rhs: Self) -> Option<Self>;

    /// `self / rhs`, or `None` on overflow or a zero divisor
    fn checked_div_value(self, rhs: Self) -> Option<Self>;
}

macro_rules! impl_numeric_int {
    ($($t:ty),* $(,)?) => {
        $(
            impl Numeric for $t {
                #[inline]
                fn checked_add_value(self, rhs: Self) -> Option<Self> {
                    self.checked_add(rhs)
                }

                #[inline]
                fn checked_sub_value(self, rhs: Self) -> Option<Self> {
                    self.checked_sub(rhs)
                }

                #[inline]
                fn checked_mul_value(self, rhs: Self) -> Option<Self> {
                    self.checked_mul(rhs)
                }

                #[inline]
                fn checked_div_value(self, rhs: Self) -> Option<Self> {
                    self.checked_div(rhs)
                }
            }
        )*
    };
}

macro_rules! impl_numeric_float {
    ($($t:ty),* $(,)?) => {
        $(
            impl Numeric for $t {
                #[inline]
                fn checked_add_value(self, rhs: Self) -> Option<Self> {
                    Some(self + rhs)
                }

                #[inline]
                fn checked_sub_value(self, rhs: Self) -> Option<Self> {
                    Some(self - rhs)
                }

                #[inline]
                fn checked_mul_value(self, rhs: Self) -> Option<Self> {
                    Some(self * rhs)
                }

                #[inline]
                fn checked_div_value(self, rhs: Self) -> Option<Self> {
                    Some(self / rhs)
                }
            }
        )*
    };
}

impl_numeric_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
impl_numeric_float!(f32, f64);
