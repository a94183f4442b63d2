use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Sub},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const USD_CURRENCY_CODE: &str = "usd";

//--------------------------------------     UsdCents       ---------------------------------------------------------
/// A US dollar amount, held as a whole number of cents.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct UsdCents(i64);

op!(binary UsdCents, Add, add);
op!(binary UsdCents, Sub, sub);
op!(inplace UsdCents, AddAssign, add_assign);

impl Sum for UsdCents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in US cents: {0}")]
pub struct UsdConversionError(String);

impl UsdCents {
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Converts a decimal dollar amount (e.g. `9.99`) into cents, rounding to the nearest cent.
    pub fn try_from_dollars(dollars: f64) -> Result<Self, UsdConversionError> {
        if !dollars.is_finite() || dollars < 0.0 {
            return Err(UsdConversionError(format!("{dollars} is not a valid price")));
        }
        let cents = (dollars * 100.0).round();
        if cents > i64::MAX as f64 {
            return Err(UsdConversionError(format!("{dollars} is too large")));
        }
        Ok(Self(cents as i64))
    }

    pub fn as_dollars(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl From<i64> for UsdCents {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Display for UsdCents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}${}.{:02}", abs / 100, abs % 100)
    }
}
