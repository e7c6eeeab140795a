mod snapshot;

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{debug, info, instrument, warn};

pub use self::snapshot::{CacheState, Failure, Quote, Snapshot, Status};
use crate::{
    clock::{Clock, SystemClock},
    error::{Error, Result},
    fetch::FetchDay,
    publication::PublicationRule,
    series::TimeSeries,
};

/// Today's and tomorrow's prices of one market.
///
/// Readers get an immutable [`Snapshot`], refreshes build a new one and swap it in.
pub struct PriceCache {
    fetcher: Box<dyn FetchDay>,
    timezone: Tz,
    publication: PublicationRule,
    max_tomorrow_attempts: u32,
    clock: Box<dyn Clock>,
    snapshot: RwLock<Arc<Snapshot>>,
    refresh_lock: Mutex<()>,
}

pub const DEFAULT_MAX_TOMORROW_ATTEMPTS: u32 = 48;

#[bon::bon]
impl PriceCache {
    #[builder]
    pub fn new(
        fetcher: Box<dyn FetchDay>,

        /// Market time zone which defines the delivery days.
        timezone: Tz,

        #[builder(default)] publication: PublicationRule,

        /// Tomorrow fetch attempts per delivery day, see [`PriceCache::refresh`].
        #[builder(default = DEFAULT_MAX_TOMORROW_ATTEMPTS)]
        max_tomorrow_attempts: u32,

        /// Defaults to the wall clock.
        clock: Option<Box<dyn Clock>>,
    ) -> Self {
        Self {
            fetcher,
            timezone,
            publication,
            max_tomorrow_attempts,
            clock: clock.unwrap_or_else(|| Box::new(SystemClock)),
            snapshot: RwLock::default(),
            refresh_lock: Mutex::new(()),
        }
    }
}

impl PriceCache {
    #[must_use]
    pub const fn timezone(&self) -> Tz {
        self.timezone
    }

    #[must_use]
    pub const fn publication(&self) -> PublicationRule {
        self.publication
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Market day which the instant belongs to.
    #[must_use]
    pub fn day_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.timezone).date_naive()
    }

    /// Fetch the missing series.
    ///
    /// Today is fetched when missing. Tomorrow is fetched once the publication time has passed,
    /// on every call until it arrives or the attempts for the delivery day are exhausted.
    /// Failures are recorded in the snapshot and the previous data stays available.
    #[instrument(skip_all, fields(now = %now))]
    pub fn refresh(&self, now: DateTime<Utc>) {
        let _guard = self.refresh_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut snapshot = Snapshot::clone(&self.load());
        let today = self.day_of(now);
        if snapshot.roll_over(today, self.timezone) {
            debug!(%today, "rolled over");
        }

        if snapshot.today_day(self.timezone) == Some(today) {
            debug!(%today, "today is cached");
        } else {
            match self.fetch(today) {
                Ok(series) => snapshot.store_today(series, now),
                Err(error) => {
                    warn!(%today, "failed to fetch today: {error}");
                    snapshot.record_failure(now, error);
                    self.store(snapshot);
                    return;
                }
            }
        }

        if let Some(tomorrow) = today.succ_opt()
            && snapshot.tomorrow.is_none()
            && now >= self.publication.for_delivery(tomorrow)
        {
            let attempts = snapshot.tomorrow_attempts(tomorrow);
            if attempts < self.max_tomorrow_attempts {
                snapshot.set_tomorrow_attempts(tomorrow, attempts + 1);
                match self.fetch(tomorrow) {
                    Ok(series) => snapshot.store_tomorrow(series, now),
                    Err(error) => {
                        let attempt = attempts + 1;
                        warn!(%tomorrow, attempt, "failed to fetch tomorrow: {error}");
                        snapshot.record_failure(now, error);
                    }
                }
            } else {
                debug!(%tomorrow, attempts, "gave up on tomorrow");
            }
        }

        self.store(snapshot);
    }

    /// Price at the instant from today's series, then from tomorrow's.
    pub fn query(&self, instant: DateTime<Utc>) -> Result<Quote> {
        self.current().query(instant)
    }

    /// Current snapshot, rolled over to the clock's market day.
    #[must_use]
    pub fn current(&self) -> Arc<Snapshot> {
        let today = self.day_of(self.clock.now());
        let snapshot = self.load();
        if !snapshot.needs_roll_over(today, self.timezone) {
            return snapshot;
        }
        let mut guard = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        let mut rolled = Snapshot::clone(&guard);
        if rolled.roll_over(today, self.timezone) {
            debug!(%today, "rolled over on read");
            *guard = Arc::new(rolled);
        }
        Arc::clone(&guard)
    }

    #[must_use]
    pub fn status(&self) -> Status {
        let now = self.clock.now();
        self.current().status(now, self.timezone, self.publication)
    }

    fn load(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn store(&self, snapshot: Snapshot) {
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(snapshot);
    }

    #[instrument(skip_all, fields(on = %on))]
    fn fetch(&self, on: NaiveDate) -> Result<TimeSeries> {
        info!("fetching…");
        let series = TimeSeries::try_from(self.fetcher.fetch_day(on)?)?;
        let day = series.market_day(self.timezone);
        if day != on {
            return Err(Error::InvalidSeries(format!("expected prices for {on}, got {day}")));
        }
        info!(n_points = series.len(), unit = %series.unit(), "fetched");
        Ok(series)
    }
}
