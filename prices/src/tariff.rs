mod window;

use std::cmp::Reverse;

use chrono::{DateTime, TimeDelta, Utc};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

pub use self::window::Window;
use crate::{
    cache::{PriceCache, Snapshot},
    error::{Error, Result},
    interval::Interval,
    series::PricePoint,
    unit::{Currency, EnergyUnit, ExchangeRates, Unit},
    vat::VatRate,
};

#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TariffKind {
    /// Fixed price, the market prices are ignored.
    Single,

    /// Day-ahead market price with VAT and margin.
    #[default]
    Spot,
}

/// Consumer tariff, configured by the host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, bon::Builder)]
pub struct Tariff {
    #[serde(default)]
    #[builder(default)]
    pub kind: TariffKind,

    #[serde(default)]
    #[builder(default)]
    pub vat_rate: VatRate,

    /// Added after VAT, in the target unit.
    #[serde(default)]
    #[builder(default)]
    pub margin: f64,

    #[serde(default = "Tariff::default_target_unit")]
    #[builder(default = Tariff::default_target_unit())]
    pub target_unit: Unit,

    /// Price of [`TariffKind::Single`], zero means «not configured».
    #[serde(default)]
    #[builder(default)]
    pub fixed_price: f64,

    #[serde(default)]
    #[builder(default)]
    pub exchange_rates: ExchangeRates,
}

impl Tariff {
    #[must_use]
    pub fn default_target_unit() -> Unit {
        Unit::new(Currency::eur(), EnergyUnit::KilowattHour)
    }

    /// Consumer price at the instant.
    pub fn effective_price(&self, cache: &PriceCache, instant: DateTime<Utc>) -> Result<f64> {
        match self.kind {
            TariffKind::Single => self.fixed_price(),
            TariffKind::Spot => {
                let quote = cache.query(instant)?;
                self.evaluate(quote.point.price, &quote.unit)
            }
        }
    }

    /// Contiguous window of the given length with the lowest average price.
    ///
    /// Ties go to the earliest window.
    pub fn cheapest_window(
        &self,
        cache: &PriceCache,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
        window_length: TimeDelta,
    ) -> Result<Window> {
        self.effective_windows(cache, range_start, range_end, window_length)?
            .into_iter()
            .min_by_key(|window| OrderedFloat(window.average))
            .ok_or_else(|| no_window(range_start, range_end, window_length))
    }

    /// Contiguous window of the given length with the highest average price.
    ///
    /// Ties go to the earliest window.
    pub fn most_expensive_window(
        &self,
        cache: &PriceCache,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
        window_length: TimeDelta,
    ) -> Result<Window> {
        self.effective_windows(cache, range_start, range_end, window_length)?
            .into_iter()
            .min_by_key(|window| Reverse(OrderedFloat(window.average)))
            .ok_or_else(|| no_window(range_start, range_end, window_length))
    }

    /// Duration-weighted average over the points lying inside the range.
    ///
    /// The single tariff averages to its fixed price.
    pub fn average_price(
        &self,
        cache: &PriceCache,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<f64> {
        let range = Interval::try_new(range_start, range_end)?;
        if self.kind == TariffKind::Single {
            return self.fixed_price();
        }
        let points = self.effective_points(&cache.current(), range)?;
        window::weighted_average(&points)
            .ok_or_else(|| Error::NotFound(format!("no prices within {range}")))
    }

    /// Consumer prices of the cached points lying inside the range, in time order.
    pub fn effective_prices(
        &self,
        cache: &PriceCache,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>> {
        self.effective_points(&cache.current(), Interval::try_new(range_start, range_end)?)
    }

    fn effective_windows(
        &self,
        cache: &PriceCache,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
        window_length: TimeDelta,
    ) -> Result<Vec<Window>> {
        if window_length <= TimeDelta::zero() {
            return Err(Error::InvalidArgument(format!(
                "window length must be positive, got {window_length}"
            )));
        }
        let range = Interval::try_new(range_start, range_end)?;
        let points = self.effective_points(&cache.current(), range)?;
        let window_seconds = window_length.num_seconds();
        if let Some(point) = points.iter().find(|point| {
            let seconds = point.interval.duration().num_seconds();
            (seconds == 0) || (window_seconds % seconds != 0)
        }) {
            return Err(Error::InvalidArgument(format!(
                "window length {window_length} is not a multiple of the {} resolution",
                point.interval.duration(),
            )));
        }
        Ok(window::windows(&points, window_length).collect())
    }

    /// Consumer prices of the cached points inside the range, in the target unit.
    fn effective_points(&self, snapshot: &Snapshot, range: Interval) -> Result<Vec<PricePoint>> {
        let mut points = Vec::new();
        for series in snapshot.series() {
            for point in series.points_within(range) {
                let price = self.evaluate(point.price, series.unit())?;
                points.push(PricePoint::new(point.interval, price));
            }
        }
        points.sort_by_key(|point| point.interval);
        Ok(points)
    }

    /// Market prices are VAT-exclusive.
    fn evaluate(&self, raw: f64, unit: &Unit) -> Result<f64> {
        match self.kind {
            TariffKind::Single => self.fixed_price(),
            TariffKind::Spot => {
                let factor = unit.factor_to(&self.target_unit, &self.exchange_rates)?;
                Ok(self.vat_rate.total(raw * factor) + self.margin)
            }
        }
    }

    fn fixed_price(&self) -> Result<f64> {
        if self.fixed_price == 0.0 { Err(Error::MissingPrice) } else { Ok(self.fixed_price) }
    }
}

fn no_window(
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
    window_length: TimeDelta,
) -> Error {
    Error::NotFound(format!(
        "no contiguous {window_length} window between {range_start} and {range_end}"
    ))
}
