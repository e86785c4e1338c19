use std::{fmt::Display, str::FromStr};

use mse_common::Money;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One basis point is 0.01%.
pub const BASIS_POINTS_PER_UNIT: i64 = 10_000;
const MAX_FEE_DECIMALS: usize = 4;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FeeRateError {
    #[error("Fee rate '{0}' is not a decimal number")]
    NotANumber(String),
    #[error("Fee rate '{0}' has more than 4 decimal places")]
    TooPrecise(String),
    #[error("Fee rate '{0}' must be between 0 and 1")]
    OutOfRange(String),
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("The order total is too large to settle")]
pub struct AmountOverflow;

/// The platform fee, as a fraction of the gross amount, stored in basis points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeeRate(i64);

impl FeeRate {
    pub fn from_basis_points(bps: i64) -> Result<Self, FeeRateError> {
        if !(0..=BASIS_POINTS_PER_UNIT).contains(&bps) {
            return Err(FeeRateError::OutOfRange(format!("{bps}bp")));
        }
        Ok(Self(bps))
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn basis_points(&self) -> i64 {
        self.0
    }
}

impl FromStr for FeeRate {
    type Err = FeeRateError;

    /// Parses a decimal fraction, e.g. `"0.05"` for a 5% fee.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || FeeRateError::NotANumber(s.to_string());
        if let Some(rest) = s.strip_prefix('-') {
            return match rest.parse::<f64>() {
                Ok(_) => Err(FeeRateError::OutOfRange(s.to_string())),
                Err(_) => Err(err()),
            };
        }
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(err());
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(err());
        }
        if frac.len() > MAX_FEE_DECIMALS {
            return Err(FeeRateError::TooPrecise(s.to_string()));
        }
        let whole = match whole {
            "" => 0,
            w => w.parse::<i64>().map_err(|_| FeeRateError::OutOfRange(s.to_string()))?,
        };
        let padded = format!("{frac:0<4}");
        let frac = padded.parse::<i64>().map_err(|_| err())?;
        let bps = whole
            .checked_mul(BASIS_POINTS_PER_UNIT)
            .and_then(|w| w.checked_add(frac))
            .ok_or_else(|| FeeRateError::OutOfRange(s.to_string()))?;
        Self::from_basis_points(bps).map_err(|_| FeeRateError::OutOfRange(s.to_string()))
    }
}

impl Display for FeeRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:04}", self.0 / BASIS_POINTS_PER_UNIT, self.0 % BASIS_POINTS_PER_UNIT)
    }
}

/// The three amounts that are written into the ledger when an order settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementAmounts {
    pub gross: Money,
    pub fee: Money,
    pub net: Money,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FeeCalculator {
    rate: FeeRate,
}

impl FeeCalculator {
    pub fn new(rate: FeeRate) -> Self {
        Self { rate }
    }

    pub fn rate(&self) -> FeeRate {
        self.rate
    }

    /// Applies the platform fee to `gross`, rounding half up to the nearest minor unit.
    ///
    /// The fee is computed once on the gross total, never per line.
    pub fn split(&self, gross: Money) -> SettlementAmounts {
        let bps = i128::from(self.rate.basis_points());
        let unit = i128::from(BASIS_POINTS_PER_UNIT);
        let g = i128::from(gross.value());
        let scaled = g * bps;
        let fee = if scaled >= 0 { (scaled + unit / 2) / unit } else { -((-scaled + unit / 2) / unit) };
        // |fee| <= |gross| since bps <= 10_000, so this always fits back into an i64
        let fee = Money::from(fee as i64);
        SettlementAmounts { gross, fee, net: gross - fee }
    }

    /// `gross = Σ(unit_price × quantity) + shipping`, followed by [`FeeCalculator::split`].
    pub fn settle<I>(&self, lines: I, shipping: Money) -> Result<SettlementAmounts, AmountOverflow>
    where I: IntoIterator<Item = (Money, i64)> {
        let gross = lines
            .into_iter()
            .try_fold(shipping, |total, (price, qty)| price.checked_mul(qty).and_then(|line| total.checked_add(line)))
            .ok_or(AmountOverflow)?;
        Ok(self.split(gross))
    }
}
