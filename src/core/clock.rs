//! Injected time source
//!
//! Date guards ("start not in the past", "end date passed") depend on the
//! current day, so the engine takes its clock as an explicit dependency
//! instead of reading ambient system time. Production uses [`SystemClock`];
//! tests and deterministic log replay use [`FixedClock`].

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use std::sync::RwLock;

/// A source of the current instant
pub trait Clock: Send + Sync {
    /// The current instant in UTC
    fn now(&self) -> DateTime<Utc>;

    /// The current calendar day (UTC)
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A pinned clock for tests and historical log replay
///
/// Starts at midnight UTC of the given day and only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    /// Pin the clock to midnight UTC of `day`
    pub fn at_day(day: NaiveDate) -> Self {
        FixedClock {
            now: RwLock::new(day.and_time(NaiveTime::MIN).and_utc()),
        }
    }

    /// Move the clock to midnight UTC of `day`
    pub fn set_day(&self, day: NaiveDate) {
        let instant = day.and_time(NaiveTime::MIN).and_utc();
        match self.now.write() {
            Ok(mut now) => *now = instant,
            Err(poisoned) => *poisoned.into_inner() = instant,
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.read() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
