use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

/// The number of atomic units (piconero) in one monero.
pub const PICONERO_PER_XMR: i64 = 1_000_000_000_000;

//--------------------------------------     Piconero       ----------------------------------------------------------
/// An amount of monero in atomic units (10^-12 XMR).
///
/// All amount comparisons in the settlement pipeline happen on this integer type. Floating point
/// only appears at the conversion boundary ([`Piconero::from_xmr`] / [`Piconero::to_xmr`]), where
/// the incoming value is rounded to the nearest atomic unit.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Piconero(i64);

op!(binary Piconero, Add, add);
op!(binary Piconero, Sub, sub);
op!(inplace Piconero, SubAssign, sub_assign);
op!(unary Piconero, Neg, neg);

impl Mul<i64> for Piconero {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Piconero {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in piconero: {0}")]
pub struct PiconeroConversionError(String);

impl From<i64> for Piconero {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Piconero {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Piconero {}

impl TryFrom<u64> for Piconero {
    type Error = PiconeroConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(PiconeroConversionError(format!("Value {} is too large to convert to Piconero", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Piconero {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.abs() < 10_000 {
            write!(f, "{} pXMR", self.0)
        } else {
            write!(f, "{:0.6} XMR", self.to_xmr())
        }
    }
}

impl Piconero {
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Converts a display-currency amount to atomic units, rounding to the nearest piconero.
    pub fn from_xmr(xmr: f64) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        Self((xmr * PICONERO_PER_XMR as f64).round() as i64)
    }

    /// Converts back to display units. For display only; never compare the results.
    pub fn to_xmr(&self) -> f64 {
        self.0 as f64 / PICONERO_PER_XMR as f64
    }
}
