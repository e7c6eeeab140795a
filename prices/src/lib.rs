//! Day-ahead electricity prices: validated series, a today/tomorrow cache with the publication
//! state machine, and consumer tariffs on top of it.

pub mod cache;
pub mod clock;
pub mod error;
pub mod fetch;
pub mod interval;
pub mod publication;
pub mod series;
pub mod tariff;
pub mod unit;
pub mod vat;

pub use self::{
    cache::{PriceCache, Status},
    error::{Error, Result},
    fetch::{DayQuotes, FetchDay, FetchError, StatusClass},
    interval::Interval,
    publication::PublicationRule,
    series::{Domain, PricePoint, TimeSeries},
    tariff::{Tariff, TariffKind, Window},
    unit::{Currency, EnergyUnit, ExchangeRate, ExchangeRates, Unit},
    vat::VatRate,
};
