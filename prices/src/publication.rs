use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Fixed clock time at which the next delivery day gets published.
///
/// The time is defined in the reference zone of the market operator,
/// independently of the zone the prices are consumed in.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PublicationRule {
    pub time: NaiveTime,
    pub timezone: Tz,
}

impl Default for PublicationRule {
    /// Day-ahead auction results are out around 12:45 CET.
    fn default() -> Self {
        Self { time: NaiveTime::from_hms_opt(12, 45, 0).unwrap_or_default(), timezone: Tz::CET }
    }
}

impl PublicationRule {
    /// Publication moment on the given day, projected into the local zone.
    #[must_use]
    pub fn on(self, day: NaiveDate, local: Tz) -> DateTime<Tz> {
        let naive = day.and_time(self.time);
        self.timezone
            .from_local_datetime(&naive)
            .earliest()
            .unwrap_or_else(|| self.timezone.from_utc_datetime(&naive))
            .with_timezone(&local)
    }

    /// When the prices for the delivery day are expected to appear.
    #[must_use]
    pub fn for_delivery(self, delivery_day: NaiveDate) -> DateTime<Utc> {
        let day = delivery_day.checked_sub_days(Days::new(1)).unwrap_or(delivery_day);
        self.on(day, self.timezone).with_timezone(&Utc)
    }
}
