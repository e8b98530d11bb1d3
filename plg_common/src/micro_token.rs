use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::{numeric, op, BPS_DENOMINATOR, MICRO_PER_UNIT};

//--------------------------------------     MicroToken       --------------------------------------------------------
/// A presale token amount in millionths of a token. Mirrors [`MicroUsdt`](crate::MicroUsdt) but is
/// deliberately a distinct type so token and fiat quantities cannot be mixed up in ledger code.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct MicroToken(i64);

op!(binary MicroToken, Add, add);
op!(binary MicroToken, Sub, sub);
op!(inplace MicroToken, SubAssign, sub_assign);
op!(unary MicroToken, Neg, neg);

impl Mul<i64> for MicroToken {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.0 * rhs)
    }
}

impl Sum for MicroToken {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in micro-tokens: {0}")]
pub struct MicroTokenConversionError(String);

impl From<i64> for MicroToken {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for MicroToken {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for MicroToken {}

impl TryFrom<u64> for MicroToken {
    type Error = MicroTokenConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(MicroTokenConversionError(format!("Value {} is too large to convert to MicroToken", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for MicroToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tokens = self.0 as f64 / MICRO_PER_UNIT as f64;
        write!(f, "{tokens:0.6}")
    }
}

impl MicroToken {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_tokens(tokens: i64) -> Self {
        Self(tokens * MICRO_PER_UNIT)
    }

    /// Parses an externally-sourced decimal value. Malformed, negative or non-finite input maps to
    /// zero micro-units; the result is never negative.
    pub fn from_decimal(value: f64) -> Self {
        Self(numeric::micro_from_f64(numeric::sanitize(value, 0.0)))
    }

    /// Scales this amount by a basis-point rate, rounding towards zero.
    pub fn scale_bps(self, bps: u32) -> Self {
        let scaled = self.0 as i128 * bps as i128 / BPS_DENOMINATOR as i128;
        Self(scaled as i64)
    }
}
