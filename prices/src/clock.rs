use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Frozen clock.
impl Clock for DateTime<Utc> {
    fn now(&self) -> DateTime<Utc> {
        *self
    }
}

#[cfg(test)]
pub mod tests {
    use std::sync::{Arc, Mutex, PoisonError};

    use chrono::TimeDelta;

    use super::*;

    /// Test clock which can be moved forward while shared with a cache.
    #[derive(Clone)]
    pub struct ManualClock(Arc<Mutex<DateTime<Utc>>>);

    impl ManualClock {
        pub fn new(now: DateTime<Utc>) -> Self {
            Self(Arc::new(Mutex::new(now)))
        }

        pub fn set(&self, now: DateTime<Utc>) {
            *self.0.lock().unwrap_or_else(PoisonError::into_inner) = now;
        }

        pub fn advance(&self, delta: TimeDelta) -> DateTime<Utc> {
            let mut now = self.0.lock().unwrap_or_else(PoisonError::into_inner);
            *now += delta;
            *now
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }
}
