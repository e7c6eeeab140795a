use std::{
    cmp::Ordering,
    fmt::{Debug, Display, Formatter},
};

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{Error, Result};

/// Half-open time range, the validity of a single price.
///
/// Equality and ordering only consider the start.
#[derive(Copy, Clone)]
#[must_use]
pub struct Interval {
    /// Inclusive.
    start: DateTime<Utc>,

    /// Exclusive.
    end: DateTime<Utc>,
}

impl Interval {
    pub fn try_new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start < end {
            Ok(Self { start, end })
        } else {
            Err(Error::InvalidArgument(format!("interval start {start} is not before end {end}")))
        }
    }

    /// Whole calendar day in the zone, from midnight to the next midnight.
    pub fn day(day: NaiveDate, timezone: Tz) -> Result<Self> {
        let midnight = |day: NaiveDate| {
            timezone
                .from_local_datetime(&day.and_time(NaiveTime::MIN))
                .earliest()
                .map(|midnight| midnight.with_timezone(&Utc))
                .ok_or_else(|| {
                    Error::InvalidArgument(format!("{day} has no midnight in {timezone}"))
                })
        };
        let next_day =
            day.succ_opt().ok_or_else(|| Error::InvalidArgument(format!("{day} is too far")))?;
        Self::try_new(midnight(day)?, midnight(next_day)?)
    }

    #[must_use]
    pub const fn start(self) -> DateTime<Utc> {
        self.start
    }

    #[must_use]
    pub const fn end(self) -> DateTime<Utc> {
        self.end
    }

    #[must_use]
    pub fn duration(self) -> TimeDelta {
        self.end - self.start
    }

    #[must_use]
    pub fn contains(self, instant: DateTime<Utc>) -> bool {
        (self.start <= instant) && (instant < self.end)
    }

    #[must_use]
    pub fn overlaps(self, other: Self) -> bool {
        (self.start < other.end) && (other.start < self.end)
    }

    /// Whether `other` lies entirely inside.
    #[must_use]
    pub fn encloses(self, other: Self) -> bool {
        (self.start <= other.start) && (other.end <= self.end)
    }
}

impl PartialEq for Interval {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start
    }
}

impl Eq for Interval {}

impl PartialOrd for Interval {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Interval {
    fn cmp(&self, other: &Self) -> Ordering {
        self.start.cmp(&other.start)
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}",
            self.start.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.end.to_rfc3339_opts(SecondsFormat::Secs, true),
        )
    }
}

impl Debug for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}..{:?}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use chrono_tz::Europe::Prague;

    use super::*;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_try_new_rejects_empty_and_reversed() {
        assert!(matches!(Interval::try_new(at(1), at(1)), Err(Error::InvalidArgument(_))));
        assert!(matches!(Interval::try_new(at(2), at(1)), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_contains_is_half_open() -> Result {
        let interval = Interval::try_new(at(1), at(2))?;
        assert!(interval.contains(at(1)));
        assert!(interval.contains(at(1) + TimeDelta::minutes(59)));
        assert!(!interval.contains(at(2)));
        assert!(!interval.contains(at(0)));
        Ok(())
    }

    #[test]
    fn test_overlaps() -> Result {
        let interval = Interval::try_new(at(1), at(3))?;
        assert!(interval.overlaps(Interval::try_new(at(2), at(4))?));
        assert!(interval.overlaps(Interval::try_new(at(0), at(5))?));
        assert!(!interval.overlaps(Interval::try_new(at(3), at(4))?));
        assert!(!interval.overlaps(Interval::try_new(at(0), at(1))?));
        Ok(())
    }

    #[test]
    fn test_ordering_by_start() -> Result {
        let short = Interval::try_new(at(1), at(2))?;
        let long = Interval::try_new(at(1), at(5))?;
        let later = Interval::try_new(at(2), at(3))?;
        assert_eq!(short, long);
        assert!(short < later);
        Ok(())
    }

    #[test]
    fn test_day_with_summer_time_switch() -> Result {
        let day = Interval::day(NaiveDate::from_ymd_opt(2025, 3, 30).unwrap(), Prague)?;
        assert_eq!(day.start(), Utc.with_ymd_and_hms(2025, 3, 29, 23, 0, 0).unwrap());
        assert_eq!(day.duration(), TimeDelta::hours(23));
        Ok(())
    }

    #[test]
    fn test_display() -> Result {
        assert_eq!(
            Interval::try_new(at(1), at(2))?.to_string(),
            "2025-03-14T01:00:00Z/2025-03-14T02:00:00Z",
        );
        Ok(())
    }
}
