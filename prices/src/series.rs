use std::fmt::{Display, Formatter};

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    interval::Interval,
    unit::{ExchangeRates, Unit},
};

/// Market area [EIC code](https://www.entsoe.eu/data/energy-identification-codes-eic/).
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize, derive_more::From)]
#[serde(transparent)]
pub struct Domain(pub String);

impl Display for Domain {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, derive_more::Constructor)]
#[must_use]
pub struct PricePoint {
    pub interval: Interval,

    /// In the unit of the owning series.
    pub price: f64,
}

/// Prices of one market day.
///
/// Points are sorted, contiguous and share the unit.
#[derive(Clone, Debug)]
#[must_use]
pub struct TimeSeries {
    domain: Domain,
    unit: Unit,
    published_at: DateTime<Utc>,
    points: Vec<PricePoint>,
}

impl TimeSeries {
    pub fn try_new(
        domain: Domain,
        unit: Unit,
        published_at: DateTime<Utc>,
        points: Vec<PricePoint>,
    ) -> Result<Self> {
        if points.is_empty() {
            return Err(Error::InvalidSeries(format!("no points for `{domain}`")));
        }
        if let Some((previous, next)) = points
            .iter()
            .tuple_windows()
            .find(|(previous, next)| previous.interval.end() != next.interval.start())
        {
            let problem = if previous.interval.overlaps(next.interval) {
                "overlaps"
            } else {
                "is not followed by"
            };
            return Err(Error::InvalidSeries(format!(
                "{} {problem} {}",
                previous.interval, next.interval
            )));
        }
        if let Some(point) = points.iter().find(|point| !point.price.is_finite()) {
            return Err(Error::InvalidSeries(format!("non-finite price at {}", point.interval)));
        }
        Ok(Self { domain, unit, published_at, points })
    }

    pub const fn domain(&self) -> &Domain {
        &self.domain
    }

    pub const fn unit(&self) -> &Unit {
        &self.unit
    }

    #[must_use]
    pub const fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }

    #[must_use]
    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Total range covered by the points.
    pub fn covered(&self) -> Interval {
        let (first, last) = (self.points[0], self.points[self.points.len() - 1]);
        Interval::try_new(first.interval.start(), last.interval.end())
            .unwrap_or(first.interval)
    }

    /// Calendar day of the first point in the market time zone.
    #[must_use]
    pub fn market_day(&self, timezone: Tz) -> NaiveDate {
        self.points[0].interval.start().with_timezone(&timezone).date_naive()
    }

    pub fn price_at(&self, instant: DateTime<Utc>) -> Result<PricePoint> {
        let index = self.points.partition_point(|point| point.interval.end() <= instant);
        self.points
            .get(index)
            .filter(|point| point.interval.contains(instant))
            .copied()
            .ok_or_else(|| Error::not_found_at(instant))
    }

    /// Points lying entirely inside the range.
    pub fn points_within(&self, range: Interval) -> impl Iterator<Item = PricePoint> + '_ {
        self.points.iter().copied().filter(move |point| range.encloses(point.interval))
    }

    pub fn convert_unit(&self, target: &Unit, rates: &ExchangeRates) -> Result<Self> {
        let factor = self.unit.factor_to(target, rates)?;
        Ok(Self {
            domain: self.domain.clone(),
            unit: target.clone(),
            published_at: self.published_at,
            points: self
                .points
                .iter()
                .map(|point| PricePoint::new(point.interval, point.price * factor))
                .collect(),
        })
    }
}

#[cfg(test)]
pub mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::{TimeDelta, TimeZone};
    use chrono_tz::Europe::Prague;

    use super::*;
    use crate::unit::{Currency, ExchangeRate};

    /// Hourly series starting at the local midnight of `day` in Prague.
    pub fn hourly(day: NaiveDate, prices: &[f64]) -> TimeSeries {
        let start = Prague
            .from_local_datetime(&day.and_hms_opt(0, 0, 0).unwrap())
            .unwrap()
            .with_timezone(&Utc);
        let points = prices
            .iter()
            .enumerate()
            .map(|(hour, price)| {
                let start = start + TimeDelta::hours(i64::try_from(hour).unwrap());
                let interval = Interval::try_new(start, start + TimeDelta::hours(1)).unwrap();
                PricePoint::new(interval, *price)
            })
            .collect();
        TimeSeries::try_new(
            Domain::from(String::from("10YCZ-CEPS-----N")),
            "EUR/MWh".parse().unwrap(),
            start - TimeDelta::hours(11),
            points,
        )
        .unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    fn point(start_hour: u32, end_hour: u32, price: f64) -> PricePoint {
        PricePoint::new(
            Interval::try_new(
                Utc.with_ymd_and_hms(2025, 3, 14, start_hour, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2025, 3, 14, end_hour, 0, 0).unwrap(),
            )
            .unwrap(),
            price,
        )
    }

    fn try_series(points: Vec<PricePoint>) -> Result<TimeSeries> {
        TimeSeries::try_new(
            Domain::from(String::from("10YFI-1--------U")),
            "EUR/MWh".parse()?,
            Utc.with_ymd_and_hms(2025, 3, 13, 11, 45, 0).unwrap(),
            points,
        )
    }

    #[test]
    fn test_rejects_gap() {
        let result = try_series(vec![point(0, 1, 1.0), point(2, 3, 1.0)]);
        assert!(matches!(result, Err(Error::InvalidSeries(_))));
    }

    #[test]
    fn test_rejects_overlap() {
        let result = try_series(vec![point(0, 2, 1.0), point(1, 3, 1.0)]);
        assert!(matches!(result, Err(Error::InvalidSeries(_))));
    }

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(try_series(Vec::new()), Err(Error::InvalidSeries(_))));
    }

    #[test]
    fn test_price_at() -> Result {
        let series = try_series(vec![point(0, 1, 10.0), point(1, 2, 20.0), point(2, 3, 30.0)])?;
        let instant = Utc.with_ymd_and_hms(2025, 3, 14, 1, 30, 0).unwrap();
        assert_abs_diff_eq!(series.price_at(instant)?.price, 20.0);
        let boundary = Utc.with_ymd_and_hms(2025, 3, 14, 2, 0, 0).unwrap();
        assert_abs_diff_eq!(series.price_at(boundary)?.price, 30.0);
        Ok(())
    }

    #[test]
    fn test_price_at_outside() -> Result {
        let series = try_series(vec![point(5, 6, 10.0)])?;
        for hour in [4, 6] {
            let instant = Utc.with_ymd_and_hms(2025, 3, 14, hour, 0, 0).unwrap();
            assert!(matches!(series.price_at(instant), Err(Error::NotFound(_))));
        }
        Ok(())
    }

    #[test]
    fn test_market_day_and_covered() {
        let series = hourly(day(), &[1.0; 24]);
        assert_eq!(series.market_day(Prague), day());
        assert_eq!(series.covered().duration(), TimeDelta::hours(24));
        assert_eq!(series.len(), 24);
    }

    #[test]
    fn test_convert_unit_round_trip() -> Result {
        let series = hourly(day(), &[-5.0, 0.0, 42.5, 120.25]);
        let rate = ExchangeRate::try_new(Currency::eur(), "CZK".parse()?, 24.7)?;
        let rates = ExchangeRates::from(vec![rate]);
        let converted = series.convert_unit(&"CZK/kWh".parse()?, &rates)?;
        assert_eq!(converted.unit().to_string(), "CZK/kWh");
        assert_abs_diff_eq!(converted.points()[2].price, 42.5 * 24.7 / 1000.0, epsilon = 1e-12);

        let restored = converted.convert_unit(series.unit(), &rates)?;
        for (original, restored) in series.points().iter().zip(restored.points()) {
            assert_abs_diff_eq!(original.price, restored.price, epsilon = 1e-9);
        }
        Ok(())
    }

    #[test]
    fn test_convert_unit_unsupported() -> Result {
        let series = hourly(day(), &[1.0]);
        let result = series.convert_unit(&"NOK/kWh".parse()?, &ExchangeRates::default());
        assert!(matches!(result, Err(Error::UnsupportedConversion { .. })));
        Ok(())
    }
}
