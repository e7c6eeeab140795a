use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};

use crate::error::{Error, Result};

#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, SerializeDisplay, DeserializeFromStr)]
pub enum EnergyUnit {
    WattHour,
    KilowattHour,
    MegawattHour,
}

impl EnergyUnit {
    const fn watt_hours(self) -> f64 {
        match self {
            Self::WattHour => 1.0,
            Self::KilowattHour => 1_000.0,
            Self::MegawattHour => 1_000_000.0,
        }
    }
}

impl FromStr for EnergyUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wh" => Ok(Self::WattHour),
            "kwh" => Ok(Self::KilowattHour),
            "mwh" => Ok(Self::MegawattHour),
            _ => Err(Error::InvalidArgument(format!("unknown energy unit `{s}`"))),
        }
    }
}

impl Display for EnergyUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::WattHour => "Wh",
            Self::KilowattHour => "kWh",
            Self::MegawattHour => "MWh",
        })
    }
}

/// ISO 4217 currency code.
#[derive(
    Clone,
    Debug,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    SerializeDisplay,
    DeserializeFromStr,
    derive_more::Display,
)]
pub struct Currency(String);

impl Currency {
    #[must_use]
    pub fn eur() -> Self {
        Self(String::from("EUR"))
    }
}

impl FromStr for Currency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let code = s.trim();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(code.to_ascii_uppercase()))
        } else {
            Err(Error::InvalidArgument(format!("`{s}` is not a currency code")))
        }
    }
}

/// Price unit, currency per energy.
#[derive(Clone, Debug, Eq, Hash, PartialEq, SerializeDisplay, DeserializeFromStr)]
pub struct Unit {
    pub currency: Currency,
    pub energy: EnergyUnit,
}

impl Unit {
    #[must_use]
    pub const fn new(currency: Currency, energy: EnergyUnit) -> Self {
        Self { currency, energy }
    }

    /// Factor which turns a price in `self` into a price in `target`.
    pub fn factor_to(&self, target: &Self, rates: &ExchangeRates) -> Result<f64> {
        let exchange_rate =
            rates.rate(&self.currency, &target.currency).ok_or_else(|| {
                Error::UnsupportedConversion { from: self.clone(), to: target.clone() }
            })?;
        Ok(exchange_rate * target.energy.watt_hours() / self.energy.watt_hours())
    }
}

impl FromStr for Unit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (currency, energy) = s
            .split_once('/')
            .ok_or_else(|| Error::InvalidArgument(format!("`{s}` is not a currency/energy unit")))?;
        Ok(Self { currency: currency.parse()?, energy: energy.parse()? })
    }
}

impl Display for Unit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.currency, self.energy)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawExchangeRate", into = "RawExchangeRate")]
pub struct ExchangeRate {
    from: Currency,
    to: Currency,

    /// Units of `to` per one unit of `from`, finite and positive.
    rate: f64,
}

impl ExchangeRate {
    pub fn try_new(from: Currency, to: Currency, rate: f64) -> Result<Self> {
        if rate.is_finite() && rate > 0.0 {
            Ok(Self { from, to, rate })
        } else {
            Err(Error::InvalidArgument(format!(
                "{from} to {to} exchange rate must be positive, got {rate}"
            )))
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
struct RawExchangeRate {
    from: Currency,
    to: Currency,
    rate: f64,
}

impl TryFrom<RawExchangeRate> for ExchangeRate {
    type Error = Error;

    fn try_from(raw: RawExchangeRate) -> Result<Self> {
        Self::try_new(raw.from, raw.to, raw.rate)
    }
}

impl From<ExchangeRate> for RawExchangeRate {
    fn from(exchange: ExchangeRate) -> Self {
        Self { from: exchange.from, to: exchange.to, rate: exchange.rate }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, derive_more::From)]
#[serde(transparent)]
pub struct ExchangeRates(Vec<ExchangeRate>);

impl ExchangeRates {
    /// Direct rate, or the inverse of the opposite one.
    #[must_use]
    pub fn rate(&self, from: &Currency, to: &Currency) -> Option<f64> {
        if from == to {
            return Some(1.0);
        }
        self.0.iter().find_map(|exchange| {
            if (&exchange.from == from) && (&exchange.to == to) {
                Some(exchange.rate)
            } else if (&exchange.from == to) && (&exchange.to == from) {
                Some(exchange.rate.recip())
            } else {
                None
            }
        })
    }
}
