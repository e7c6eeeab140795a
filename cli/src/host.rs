use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use prices::{Error, Interval, PriceCache, Status, Tariff, TariffKind, Window};

use crate::prelude::*;

/// Receives the cache status whenever it changes.
pub trait StatusReporter: Send + Sync {
    fn report(&self, status: Status, detail: Option<&str>);
}

impl<R: StatusReporter> StatusReporter for Arc<R> {
    fn report(&self, status: Status, detail: Option<&str>) {
        R::report(self, status, detail);
    }
}

/// Reports into the log.
pub struct LogReporter;

impl StatusReporter for LogReporter {
    fn report(&self, status: Status, detail: Option<&str>) {
        let detail = detail.unwrap_or_default();
        match status {
            Status::Ok | Status::NotYetPublished => info!(%status, detail, "status changed"),
            Status::Stale => warn!(%status, detail, "status changed"),
            Status::Error => error!(%status, detail, "status changed"),
        }
    }
}

/// Values exposed to the host, `None` when unknown.
#[derive(Clone, Debug, Default)]
pub struct Channels {
    pub current_price: Option<f64>,
    pub next_price: Option<f64>,
    pub today_average: Option<f64>,
    pub cheapest_window: Option<Window>,
    pub most_expensive_window: Option<Window>,
}

impl Channels {
    pub fn trace(&self) {
        info!(
            current_price = ?self.current_price,
            next_price = ?self.next_price,
            today_average = ?self.today_average,
            cheapest_window = ?self.cheapest_window.map(|window| window.interval),
            most_expensive_window = ?self.most_expensive_window.map(|window| window.interval),
            "channels",
        );
    }
}

/// One configured tariff bound to its price cache.
pub struct Handler<R> {
    tariff: Tariff,
    cache: PriceCache,
    reporter: R,
    window_length: TimeDelta,
    last_report: Mutex<Option<(Status, Option<String>)>>,
}

#[bon::bon]
impl<R: StatusReporter> Handler<R> {
    #[builder]
    pub fn new(
        tariff: Tariff,
        cache: PriceCache,
        reporter: R,
        #[builder(default = TimeDelta::hours(3))] window_length: TimeDelta,
    ) -> Self {
        Self { tariff, cache, reporter, window_length, last_report: Mutex::new(None) }
    }
}

impl<R: StatusReporter> Handler<R> {
    pub const fn tariff(&self) -> &Tariff {
        &self.tariff
    }

    pub const fn cache(&self) -> &PriceCache {
        &self.cache
    }

    pub const fn window_length(&self) -> TimeDelta {
        self.window_length
    }

    /// Refresh the cache if the tariff needs the market prices, and report the status.
    pub fn refresh(&self, now: DateTime<Utc>) -> Status {
        if self.tariff.kind == TariffKind::Spot {
            self.cache.refresh(now);
        }
        let (status, detail) = self.status(now);
        let mut last_report = self.last_report.lock().unwrap_or_else(PoisonError::into_inner);
        let report = (status, detail);
        if last_report.as_ref() != Some(&report) {
            self.reporter.report(report.0, report.1.as_deref());
            *last_report = Some(report);
        }
        status
    }

    pub fn status(&self, now: DateTime<Utc>) -> (Status, Option<String>) {
        if let Err(error) = self.tariff.effective_price(&self.cache, now)
            && error.is_configuration()
        {
            return (Status::Error, Some(format!("configuration incomplete: {error}")));
        }
        match self.tariff.kind {
            TariffKind::Single => (Status::Ok, None),
            TariffKind::Spot => {
                let snapshot = self.cache.current();
                let status =
                    snapshot.status(now, self.cache.timezone(), self.cache.publication());
                (status, snapshot.last_failure.as_ref().map(|failure| failure.error.to_string()))
            }
        }
    }

    /// Windows are searched from the current point till the end of tomorrow.
    pub fn window_range(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let range_start =
            self.cache.query(now).map_or(now, |quote| quote.point.interval.start());
        let range_end = self
            .cache
            .day_of(now)
            .succ_opt()
            .and_then(|tomorrow| Interval::day(tomorrow, self.cache.timezone()).ok())
            .map_or(now + TimeDelta::days(2), Interval::end);
        (range_start, range_end)
    }

    pub fn channels(&self, now: DateTime<Utc>) -> Channels {
        let next_start = self.cache.query(now).map_or(now, |quote| quote.point.interval.end());

        let today_average = Interval::day(self.cache.day_of(now), self.cache.timezone())
            .and_then(|day| self.tariff.average_price(&self.cache, day.start(), day.end()));

        let (cheapest_window, most_expensive_window) = match self.tariff.kind {
            TariffKind::Single => (None, None),
            TariffKind::Spot => {
                let (range_start, range_end) = self.window_range(now);
                (
                    channel(
                        "cheapest window",
                        self.tariff.cheapest_window(
                            &self.cache,
                            range_start,
                            range_end,
                            self.window_length,
                        ),
                    ),
                    channel(
                        "most expensive window",
                        self.tariff.most_expensive_window(
                            &self.cache,
                            range_start,
                            range_end,
                            self.window_length,
                        ),
                    ),
                )
            }
        };

        Channels {
            current_price: channel("current price", self.tariff.effective_price(&self.cache, now)),
            next_price: channel("next price", self.tariff.effective_price(&self.cache, next_start)),
            today_average: channel("today average", today_average),
            cheapest_window,
            most_expensive_window,
        }
    }
}

/// Unknown values are expected before the publication, anything else gets logged.
fn channel<T>(name: &str, result: prices::Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error @ Error::NotFound(_)) => {
            debug!(name, "no value: {error}");
            None
        }
        Err(error) => {
            warn!(name, "no value: {error}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use approx::assert_abs_diff_eq;
    use chrono::{NaiveDate, TimeZone};
    use chrono_tz::Europe::Prague;
    use http::StatusCode;
    use prices::{DayQuotes, Domain, FetchDay, FetchError, VatRate};

    use super::*;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(Status, Option<String>)>>);

    impl StatusReporter for Recorder {
        fn report(&self, status: Status, detail: Option<&str>) {
            self.0.lock().unwrap().push((status, detail.map(ToOwned::to_owned)));
        }
    }

    impl Recorder {
        fn statuses(&self) -> Vec<Status> {
            self.0.lock().unwrap().iter().map(|(status, _)| *status).collect()
        }
    }

    /// Hourly EUR/MWh quotes by the delivery day.
    #[derive(Default)]
    struct Quotes(HashMap<NaiveDate, DayQuotes>);

    impl Quotes {
        fn with(mut self, day: u32, prices: &[f64]) -> Self {
            let on = date(day);
            let start = Interval::day(on, Prague).unwrap().start();
            let points = prices
                .iter()
                .zip(0..)
                .map(|(price, hour)| {
                    let start = start + TimeDelta::hours(hour);
                    (Interval::try_new(start, start + TimeDelta::hours(1)).unwrap(), *price)
                })
                .collect();
            let quotes = DayQuotes {
                domain: Domain::from(String::from("10YCZ-CEPS-----N")),
                unit: "EUR/MWh".parse().unwrap(),
                published_at: start - TimeDelta::hours(11),
                points,
            };
            self.0.insert(on, quotes);
            self
        }
    }

    impl FetchDay for Quotes {
        fn fetch_day(&self, on: NaiveDate) -> Result<DayQuotes, FetchError> {
            self.0
                .get(&on)
                .cloned()
                .ok_or_else(|| FetchError::from_response(StatusCode::OK, "No matching data found"))
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    fn local(day: u32, hour: u32) -> DateTime<Utc> {
        Prague.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap().with_timezone(&Utc)
    }

    fn handler(tariff: Tariff, quotes: Quotes, now: DateTime<Utc>) -> Handler<Arc<Recorder>> {
        let cache = PriceCache::builder()
            .fetcher(Box::new(quotes))
            .timezone(Prague)
            .clock(Box::new(now))
            .build();
        Handler::builder()
            .tariff(tariff)
            .cache(cache)
            .reporter(Arc::new(Recorder::default()))
            .window_length(TimeDelta::hours(2))
            .build()
    }

    #[test]
    fn test_single_missing_price() {
        let tariff = Tariff::builder().kind(TariffKind::Single).build();
        let handler = handler(tariff, Quotes::default(), local(14, 10));
        assert_eq!(handler.refresh(local(14, 10)), Status::Error);
        let reports = handler.reporter.0.lock().unwrap().clone();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].1.as_deref().unwrap().starts_with("configuration incomplete"));
        assert!(handler.channels(local(14, 10)).current_price.is_none());
    }

    #[test]
    fn test_single_channels() {
        let tariff = Tariff::builder().kind(TariffKind::Single).fixed_price(0.25).build();
        let handler = handler(tariff, Quotes::default(), local(14, 10));
        assert_eq!(handler.refresh(local(14, 10)), Status::Ok);
        let channels = handler.channels(local(14, 10));
        assert_eq!(channels.current_price, Some(0.25));
        assert_eq!(channels.next_price, Some(0.25));
        assert_eq!(channels.today_average, Some(0.25));
        assert!(channels.cheapest_window.is_none());
    }

    #[test]
    fn test_spot_channels() -> Result {
        let tariff = Tariff::builder().vat_rate(VatRate::try_new(25.0)?).build();
        let mut prices = vec![100.0; 24];
        prices[10] = 200.0;
        prices[11] = 300.0;
        prices[14] = 20.0;
        prices[15] = 40.0;
        let handler = handler(tariff, Quotes::default().with(14, &prices), local(14, 10));
        assert_eq!(handler.refresh(local(14, 10)), Status::Ok);

        let channels = handler.channels(local(14, 10) + TimeDelta::minutes(30));
        assert_abs_diff_eq!(channels.current_price.unwrap(), 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(channels.next_price.unwrap(), 0.375, epsilon = 1e-12);
        let average = (100.0 * 20.0 + 200.0 + 300.0 + 20.0 + 40.0) / 24.0 * 1.25 / 1000.0;
        assert_abs_diff_eq!(channels.today_average.unwrap(), average, epsilon = 1e-12);

        let cheapest = channels.cheapest_window.unwrap();
        assert_eq!(cheapest.interval.start(), local(14, 14));
        assert_abs_diff_eq!(cheapest.average, 0.0375, epsilon = 1e-12);
        let most_expensive = channels.most_expensive_window.unwrap();
        assert_eq!(most_expensive.interval.start(), local(14, 10));
        Ok(())
    }

    #[test]
    fn test_spot_reports_changes_only() {
        let quotes = Quotes::default().with(14, &[1.0; 24]);
        let handler = handler(Tariff::builder().build(), quotes, local(14, 10));
        assert_eq!(handler.refresh(local(14, 10)), Status::Ok);
        assert_eq!(handler.refresh(local(14, 11)), Status::Ok);
        assert_eq!(handler.refresh(local(14, 15)), Status::NotYetPublished);
        assert_eq!(handler.reporter.statuses(), [Status::Ok, Status::NotYetPublished]);
    }

    #[test]
    fn test_spot_nothing_fetched() {
        let handler = handler(Tariff::builder().build(), Quotes::default(), local(14, 10));
        assert_eq!(handler.refresh(local(14, 10)), Status::NotYetPublished);
        let channels = handler.channels(local(14, 10));
        assert!(channels.current_price.is_none());
        assert!(channels.today_average.is_none());
        assert!(channels.cheapest_window.is_none());
    }
}
