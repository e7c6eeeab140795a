use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use itertools::Itertools;
use prices::{Currency, EnergyUnit, Interval, Unit};
use serde::{Deserialize, Deserializer, de};
use serde_with::DeserializeFromStr;

use crate::prelude::*;

/// `Publication_MarketDocument` with the day-ahead prices.
#[derive(Deserialize)]
pub struct PublicationDocument {
    #[serde(rename = "createdDateTime", deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,

    #[serde(rename = "TimeSeries", default)]
    pub time_series: Vec<TimeSeries>,
}

impl PublicationDocument {
    /// Unit shared by all the time series.
    pub fn unit(&self) -> Result<Unit> {
        let units: Vec<Unit> = self
            .time_series
            .iter()
            .map(|series| Unit::new(series.currency.clone(), series.energy))
            .unique()
            .collect();
        match units.as_slice() {
            [unit] => Ok(unit.clone()),
            [] => bail!("the document contains no time series"),
            _ => bail!("the time series have different units: {}", units.iter().join(", ")),
        }
    }

    /// Expanded points of the finest resolution, in time order.
    ///
    /// Newer documents carry the same day both in the hourly and in the quarter-hourly resolution.
    pub fn points(&self) -> Result<Vec<(Interval, f64)>> {
        let periods = self.time_series.iter().flat_map(|series| &series.periods).collect_vec();
        let Some(resolution) = periods.iter().map(|period| period.resolution).min() else {
            return Ok(Vec::new());
        };
        let mut points = Vec::new();
        for period in periods.into_iter().filter(|period| period.resolution == resolution) {
            points.extend(period.expand()?);
        }
        points.sort_by_key(|(interval, _)| *interval);
        points.dedup_by_key(|(interval, _)| *interval);
        Ok(points)
    }
}

#[derive(Deserialize)]
pub struct TimeSeries {
    #[serde(rename = "currency_Unit.name")]
    pub currency: Currency,

    #[serde(rename = "price_Measure_Unit.name")]
    pub energy: EnergyUnit,

    #[serde(rename = "Period", default)]
    pub periods: Vec<Period>,
}

#[derive(Deserialize)]
pub struct Period {
    #[serde(rename = "timeInterval")]
    pub time_interval: TimeInterval,

    pub resolution: Resolution,

    #[serde(rename = "Point", default)]
    pub points: Vec<Point>,
}

impl Period {
    /// One point per resolution step.
    ///
    /// The `A03` curve omits positions whose price equals the previous one,
    /// those are filled forward.
    pub fn expand(&self) -> Result<Vec<(Interval, f64)>> {
        let step = self.resolution.0;
        let duration = self.time_interval.end - self.time_interval.start;
        ensure!(
            duration > TimeDelta::zero() && (duration.num_seconds() % step.num_seconds() == 0),
            "period from {} to {} is not a multiple of {step}",
            self.time_interval.start,
            self.time_interval.end,
        );
        let n_positions = duration.num_seconds() / step.num_seconds();

        let mut points = self.points.iter().sorted_by_key(|point| point.position).peekable();
        let mut price = None;
        let mut expanded = Vec::new();
        for position in 1..=n_positions {
            while let Some(point) = points.next_if(|point| i64::from(point.position) <= position) {
                price = Some(point.price);
            }
            let Some(price) = price else {
                bail!("position {position} precedes the first point");
            };
            let start = self.time_interval.start + step * i32::try_from(position - 1)?;
            expanded.push((Interval::try_new(start, start + step)?, price));
        }
        Ok(expanded)
    }
}

#[derive(Deserialize)]
pub struct TimeInterval {
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub start: DateTime<Utc>,

    #[serde(deserialize_with = "deserialize_timestamp")]
    pub end: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct Point {
    /// One-based.
    pub position: u32,

    #[serde(rename = "price.amount")]
    pub price: f64,
}

/// ISO 8601 duration like `PT15M` or `PT1H`.
#[derive(Copy, Clone, Debug, Eq, Ord, PartialEq, PartialOrd, DeserializeFromStr)]
pub struct Resolution(pub TimeDelta);

impl FromStr for Resolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let duration =
            s.strip_prefix("PT").with_context(|| format!("unsupported resolution `{s}`"))?;
        let resolution = if let Some(minutes) = duration.strip_suffix('M') {
            TimeDelta::minutes(minutes.parse()?)
        } else if let Some(hours) = duration.strip_suffix('H') {
            TimeDelta::hours(hours.parse()?)
        } else {
            bail!("unsupported resolution `{s}`");
        };
        ensure!(resolution > TimeDelta::zero(), "resolution `{s}` must be positive");
        Ok(Self(resolution))
    }
}

/// `Acknowledgement_MarketDocument`, returned instead of the prices.
#[derive(Deserialize)]
pub struct Acknowledgement {
    #[serde(rename = "Reason", default)]
    pub reasons: Vec<Reason>,
}

impl Acknowledgement {
    pub fn reason(&self) -> String {
        self.reasons
            .iter()
            .map(|reason| match &reason.text {
                Some(text) => format!("{text} ({})", reason.code),
                None => reason.code.clone(),
            })
            .join("; ")
    }
}

#[derive(Deserialize)]
pub struct Reason {
    pub code: String,

    #[serde(default)]
    pub text: Option<String>,
}

/// Timestamps come both with and without seconds.
fn deserialize_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<DateTime<Utc>, D::Error> {
    let text = String::deserialize(deserializer)?;
    parse_timestamp(&text).map_err(de::Error::custom)
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(text).map(|timestamp| timestamp.to_utc()).or_else(|_| {
        NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%MZ").map(|timestamp| timestamp.and_utc())
    })
}
