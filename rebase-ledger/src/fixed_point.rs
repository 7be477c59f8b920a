//! Deterministic fixed-point arithmetic
//!
//! Rates and price indices are carried as `U256` integers scaled by `10^18`.
//! Every operation truncates toward zero and checks each intermediate product,
//! so an overflow is reported before any truncation can hide it. No floating
//! point is involved anywhere.

use primitive_types::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of decimal digits carried by [`FixedPoint`]
pub const FIXED_POINT_DECIMALS: u32 = 18;

/// `10^18`, the raw representation of `1.0`
pub const ONE: U256 = U256([1_000_000_000_000_000_000, 0, 0, 0]);

/// Arithmetic failures
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MathError {
    /// Divisor was zero
    #[error("division by zero")]
    DivisionByZero,

    /// An intermediate or final value exceeded 256 bits
    #[error("arithmetic overflow")]
    Overflow,

    /// A negative value was supplied where only unsigned values are meaningful
    #[error("negative value")]
    NegativeValue,
}

/// `a * b / c`, truncated, failing on overflow of `a * b`
pub fn mul_div(a: U256, b: U256, c: U256) -> Result<U256, MathError> {
    if c.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let product = a.checked_mul(b).ok_or(MathError::Overflow)?;
    Ok(product / c)
}

/// Fixed-point multiply: `a * b / 10^18`
pub fn mul_fixed(a: U256, b: U256) -> Result<U256, MathError> {
    mul_div(a, b, ONE)
}

/// Fixed-point divide: `a * 10^18 / b`
pub fn div_fixed(a: U256, b: U256) -> Result<U256, MathError> {
    mul_div(a, ONE, b)
}

/// Unsigned fixed-point number with 18 decimals
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FixedPoint(U256);

impl FixedPoint {
    /// `0.0`
    pub const ZERO: FixedPoint = FixedPoint(U256([0, 0, 0, 0]));

    /// `1.0`
    pub const ONE: FixedPoint = FixedPoint(ONE);

    /// Wrap an already-scaled value
    pub const fn from_raw(raw: U256) -> Self {
        Self(raw)
    }

    /// Scaled integer representation
    pub const fn raw(&self) -> U256 {
        self.0
    }

    /// Whole number `n` as `n * 10^18`
    pub fn from_integer(n: u128) -> Result<Self, MathError> {
        U256::from(n)
            .checked_mul(ONE)
            .map(Self)
            .ok_or(MathError::Overflow)
    }

    /// Convert an exact decimal such as `0.05`; digits past the 18th are truncated
    pub fn from_decimal(value: Decimal) -> Result<Self, MathError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(MathError::NegativeValue);
        }

        let mantissa = U256::from(value.mantissa().unsigned_abs());
        let scale = value.scale();

        let raw = if scale <= FIXED_POINT_DECIMALS {
            mantissa
                .checked_mul(U256::exp10((FIXED_POINT_DECIMALS - scale) as usize))
                .ok_or(MathError::Overflow)?
        } else {
            mantissa / U256::exp10((scale - FIXED_POINT_DECIMALS) as usize)
        };

        Ok(Self(raw))
    }

    /// `self * other`
    pub fn mul(self, other: FixedPoint) -> Result<FixedPoint, MathError> {
        mul_fixed(self.0, other.0).map(Self)
    }

    /// `self / other`
    pub fn div(self, other: FixedPoint) -> Result<FixedPoint, MathError> {
        div_fixed(self.0, other.0).map(Self)
    }

    /// `|self - other|`
    pub fn abs_diff(self, other: FixedPoint) -> FixedPoint {
        if self.0 >= other.0 {
            Self(self.0 - other.0)
        } else {
            Self(other.0 - self.0)
        }
    }

    /// Whether the value is exactly zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for FixedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let integer = self.0 / ONE;
        let fraction = (self.0 % ONE).low_u64();

        if fraction == 0 {
            return write!(f, "{}", integer);
        }

        let digits = format!("{:018}", fraction);
        write!(f, "{}.{}", integer, digits.trim_end_matches('0'))
    }
}

impl From<U256> for FixedPoint {
    fn from(raw: U256) -> Self {
        Self(raw)
    }
}
