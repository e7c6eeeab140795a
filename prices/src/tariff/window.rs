use chrono::TimeDelta;

use crate::{interval::Interval, series::PricePoint};

#[derive(Copy, Clone, Debug, PartialEq)]
#[must_use]
pub struct Window {
    pub interval: Interval,

    /// Duration-weighted average price.
    pub average: f64,
}

/// All contiguous windows of exactly the given length, in the order of their start.
///
/// The points must be sorted. Windows which would span a gap are skipped.
pub fn windows(points: &[PricePoint], length: TimeDelta) -> impl Iterator<Item = Window> + '_ {
    (0..points.len()).filter_map(move |start_index| {
        let mut duration = TimeDelta::zero();
        for (index, point) in points.iter().enumerate().skip(start_index) {
            if (index != start_index)
                && (points[index - 1].interval.end() != point.interval.start())
            {
                return None;
            }
            duration += point.interval.duration();
            if duration >= length {
                if duration != length {
                    return None;
                }
                let window = &points[start_index..=index];
                let interval =
                    Interval::try_new(points[start_index].interval.start(), point.interval.end())
                        .ok()?;
                return weighted_average(window).map(|average| Window { interval, average });
            }
        }
        None
    })
}

#[expect(clippy::cast_precision_loss)]
pub fn weighted_average(points: &[PricePoint]) -> Option<f64> {
    let (total, seconds) = points.iter().fold((0.0, 0_i64), |(total, seconds), point| {
        let duration = point.interval.duration().num_seconds();
        (total + point.price * duration as f64, seconds + duration)
    });
    (seconds != 0).then(|| total / seconds as f64)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::{DateTime, TimeZone, Utc};
    use itertools::Itertools;

    use super::*;

    fn at(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 0, 0, 0).unwrap() + TimeDelta::minutes(minute)
    }

    fn point(start: i64, end: i64, price: f64) -> PricePoint {
        PricePoint::new(Interval::try_new(at(start), at(end)).unwrap(), price)
    }

    #[test]
    fn test_windows_quarterly() {
        let points =
            [point(0, 15, 4.0), point(15, 30, 2.0), point(30, 45, 0.0), point(45, 60, 2.0)];
        let windows = windows(&points, TimeDelta::minutes(30)).collect_vec();
        assert_eq!(windows.len(), 3);
        assert_abs_diff_eq!(windows[0].average, 3.0);
        assert_abs_diff_eq!(windows[1].average, 1.0);
        assert_eq!(windows[2].interval.start(), at(30));
    }

    #[test]
    fn test_windows_skip_gaps() {
        let points = [point(0, 60, 1.0), point(120, 180, 1.0), point(180, 240, 1.0)];
        let windows = windows(&points, TimeDelta::hours(2)).collect_vec();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].interval.start(), at(120));
    }

    #[test]
    fn test_windows_must_align() {
        let points = [point(0, 60, 1.0), point(60, 120, 1.0)];
        assert_eq!(windows(&points, TimeDelta::minutes(90)).count(), 0);
    }

    #[test]
    fn test_weighted_average() {
        let points = [point(0, 15, 8.0), point(15, 60, 0.0)];
        assert_abs_diff_eq!(weighted_average(&points).unwrap(), 2.0);
        assert!(weighted_average(&[]).is_none());
    }
}
