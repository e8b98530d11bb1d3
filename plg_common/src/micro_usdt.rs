use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::{numeric, op, BPS_DENOMINATOR, MICRO_PER_UNIT};

pub const USDT_CURRENCY_CODE: &str = "USDT";
pub const USDT_CURRENCY_CODE_LOWER: &str = "usdt";

//--------------------------------------     MicroUsdt       ---------------------------------------------------------
/// A fiat-equivalent amount in millionths of a USDT. All ledger arithmetic happens in integer
/// micro-units; floating point only appears at the parsing boundary.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct MicroUsdt(i64);

op!(binary MicroUsdt, Add, add);
op!(binary MicroUsdt, Sub, sub);
op!(inplace MicroUsdt, SubAssign, sub_assign);
op!(unary MicroUsdt, Neg, neg);

impl Mul<i64> for MicroUsdt {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.0 * rhs)
    }
}

impl Sum for MicroUsdt {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in microUSDT: {0}")]
pub struct MicroUsdtConversionError(String);

impl From<i64> for MicroUsdt {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for MicroUsdt {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for MicroUsdt {}

impl TryFrom<u64> for MicroUsdt {
    type Error = MicroUsdtConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(MicroUsdtConversionError(format!("Value {} is too large to convert to MicroUsdt", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for MicroUsdt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.abs() < 10_000 {
            write!(f, "{}µUSDT", self.0)
        } else {
            let usdt = self.0 as f64 / MICRO_PER_UNIT as f64;
            write!(f, "{usdt:0.2} USDT")
        }
    }
}

impl MicroUsdt {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_usdt(usdt: i64) -> Self {
        Self(usdt * MICRO_PER_UNIT)
    }

    /// Parses an externally-sourced decimal value. Malformed, negative or non-finite input maps to
    /// zero micro-units; the result is never negative.
    pub fn from_decimal(value: f64) -> Self {
        Self(numeric::micro_from_f64(numeric::sanitize(value, 0.0)))
    }

    /// Scales this amount by a basis-point rate, rounding towards zero. Uses 128-bit intermediate
    /// arithmetic so rates cannot overflow on large balances.
    pub fn scale_bps(self, bps: u32) -> Self {
        let scaled = self.0 as i128 * bps as i128 / BPS_DENOMINATOR as i128;
        Self(scaled as i64)
    }
}
