use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Value-added tax percentage.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
#[must_use]
pub struct VatRate(f64);

impl VatRate {
    pub const ZERO: Self = Self(0.0);

    pub fn try_new(rate: f64) -> Result<Self> {
        if (0.0..=100.0).contains(&rate) {
            // Folds `-0.0` into `0.0`.
            Ok(Self(rate + 0.0))
        } else {
            Err(Error::InvalidArgument(format!("VAT rate must be within 0..=100, got {rate}")))
        }
    }

    #[must_use]
    pub const fn percent(self) -> f64 {
        self.0
    }

    #[must_use]
    const fn multiplier(self) -> f64 {
        1.0 + self.0 / 100.0
    }

    /// VAT-exclusive price of the VAT-inclusive total.
    #[must_use]
    pub fn price(self, total: f64) -> f64 {
        total / self.multiplier()
    }

    /// VAT amount contained in the total.
    #[must_use]
    pub fn vat_from_total(self, total: f64) -> f64 {
        total - self.price(total)
    }

    /// VAT-inclusive total of the VAT-exclusive price.
    #[must_use]
    pub fn total(self, price: f64) -> f64 {
        price * self.multiplier()
    }
}

impl Default for VatRate {
    fn default() -> Self {
        Self::ZERO
    }
}

impl TryFrom<f64> for VatRate {
    type Error = Error;

    fn try_from(rate: f64) -> Result<Self> {
        Self::try_new(rate)
    }
}

impl From<VatRate> for f64 {
    fn from(rate: VatRate) -> Self {
        rate.0
    }
}

impl FromStr for VatRate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let rate = s.trim().trim_end_matches('%').trim_end();
        let rate = rate
            .parse::<f64>()
            .map_err(|_| Error::InvalidArgument(format!("`{s}` is not a VAT rate")))?;
        Self::try_new(rate)
    }
}

impl Display for VatRate {
    /// `f64` displays whole numbers without the fractional part.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "VAT {}%", self.0)
    }
}
