use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Injectable wall-clock source.
///
/// The lifecycle manager never reads the system time directly, so tests can
/// reconstruct elapsed time from a fixed instant without real delays.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real thing.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to a manually adjustable instant.
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(instant)),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock() = instant;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn manual_clock_holds_and_advances() {
        let start = Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap();
        let clock = ManualClock::at(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::seconds(125));
        assert_eq!(clock.now(), start + Duration::seconds(125));

        clock.set(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn clones_share_the_instant() {
        let start = Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap();
        let clock = ManualClock::at(start);
        let other = clock.clone();
        clock.advance(Duration::seconds(10));
        assert_eq!(other.now(), start + Duration::seconds(10));
    }
}
