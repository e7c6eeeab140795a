use std::{
    fmt::{Display, Formatter},
    sync::Arc,
};

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::{
    error::{Error, Result},
    fetch::StatusClass,
    publication::PublicationRule,
    series::{PricePoint, TimeSeries},
    unit::Unit,
};

/// Immutable view of the cached series.
#[derive(Clone, Debug, Default)]
#[must_use]
pub struct Snapshot {
    pub today: Option<Arc<TimeSeries>>,
    pub tomorrow: Option<Arc<TimeSeries>>,
    pub last_fetched_at: Option<DateTime<Utc>>,

    /// Set by a failed fetch, cleared by a successful one.
    pub last_failure: Option<Failure>,

    tomorrow_attempts: Option<(NaiveDate, u32)>,
}

#[derive(Clone, Debug)]
pub struct Failure {
    pub at: DateTime<Utc>,
    pub error: Error,
}

#[derive(Clone, Debug)]
pub struct Quote {
    pub point: PricePoint,
    pub unit: Unit,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CacheState {
    Empty,
    HasToday,
    HasTodayAndTomorrow,

    /// The last fetch failed, the cached series are still served.
    Stale,
}

/// Cache status as reported to the host.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Ok,
    Stale,
    NotYetPublished,
    Error,
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Ok => "ok",
            Self::Stale => "stale",
            Self::NotYetPublished => "not-yet-published",
            Self::Error => "error",
        })
    }
}

impl Snapshot {
    /// Cached series, today first.
    pub fn series(&self) -> impl Iterator<Item = &TimeSeries> {
        self.today.iter().chain(self.tomorrow.iter()).map(AsRef::as_ref)
    }

    pub fn query(&self, instant: DateTime<Utc>) -> Result<Quote> {
        self.series()
            .find_map(|series| {
                series
                    .price_at(instant)
                    .ok()
                    .map(|point| Quote { point, unit: series.unit().clone() })
            })
            .ok_or_else(|| Error::not_found_at(instant))
    }

    #[must_use]
    pub fn state(&self) -> CacheState {
        match (&self.today, &self.tomorrow, &self.last_failure) {
            (None, None, _) => CacheState::Empty,
            (_, _, Some(_)) => CacheState::Stale,
            (Some(_), Some(_), None) => CacheState::HasTodayAndTomorrow,
            (_, _, None) => CacheState::HasToday,
        }
    }

    #[must_use]
    pub fn status(&self, now: DateTime<Utc>, timezone: Tz, publication: PublicationRule) -> Status {
        let today = now.with_timezone(&timezone).date_naive();
        let has_today = self.today_day(timezone) == Some(today);
        match &self.last_failure {
            Some(Failure { error: Error::Fetch(error), .. })
                if error.class == StatusClass::Success =>
            {
                Status::NotYetPublished
            }
            Some(_) if !has_today => Status::Error,
            Some(_) => Status::Stale,
            None if !has_today => Status::NotYetPublished,
            None => {
                let is_due = today
                    .succ_opt()
                    .is_some_and(|tomorrow| now >= publication.for_delivery(tomorrow));
                if is_due && self.tomorrow.is_none() {
                    Status::NotYetPublished
                } else {
                    Status::Ok
                }
            }
        }
    }

    #[must_use]
    pub fn today_day(&self, timezone: Tz) -> Option<NaiveDate> {
        self.today.as_ref().map(|series| series.market_day(timezone))
    }

    #[must_use]
    pub fn needs_roll_over(&self, today: NaiveDate, timezone: Tz) -> bool {
        match (&self.today, &self.tomorrow) {
            (Some(series), _) => series.market_day(timezone) < today,
            (None, Some(series)) => series.market_day(timezone) <= today,
            (None, None) => false,
        }
    }

    /// Shift tomorrow into today until today is not in the past.
    ///
    /// Returns whether anything changed.
    pub(super) fn roll_over(&mut self, today: NaiveDate, timezone: Tz) -> bool {
        let mut is_changed = false;
        while self.needs_roll_over(today, timezone) {
            self.today = self.tomorrow.take();
            is_changed = true;
        }
        if self.tomorrow_attempts.is_some_and(|(day, _)| day <= today) {
            self.tomorrow_attempts = None;
        }
        is_changed
    }

    pub(super) fn store_today(&mut self, series: TimeSeries, now: DateTime<Utc>) {
        self.today = Some(Arc::new(series));
        self.record_success(now);
    }

    pub(super) fn store_tomorrow(&mut self, series: TimeSeries, now: DateTime<Utc>) {
        self.tomorrow = Some(Arc::new(series));
        self.tomorrow_attempts = None;
        self.record_success(now);
    }

    pub(super) fn record_failure(&mut self, at: DateTime<Utc>, error: Error) {
        self.last_failure = Some(Failure { at, error });
    }

    fn record_success(&mut self, now: DateTime<Utc>) {
        self.last_fetched_at = Some(now);
        self.last_failure = None;
    }

    pub(super) fn tomorrow_attempts(&self, tomorrow: NaiveDate) -> u32 {
        match self.tomorrow_attempts {
            Some((day, attempts)) if day == tomorrow => attempts,
            _ => 0,
        }
    }

    pub(super) const fn set_tomorrow_attempts(&mut self, tomorrow: NaiveDate, attempts: u32) {
        self.tomorrow_attempts = Some((tomorrow, attempts));
    }
}
