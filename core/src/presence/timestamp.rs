//! Elapsed/remaining time shown on the presence card.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Serialize;

/// Unix milliseconds. Discord counts up from `start` and down to `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Timestamp {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<u64>,
}

impl Timestamp {
    pub fn new(start: Option<u64>, end: Option<u64>) -> Self {
        Self { start, end }
    }

    /// Counting up from this moment.
    pub fn now() -> Self {
        Self::new(Some(unix_millis(&Utc::now())), None)
    }

    /// Counting down to `span` from now.
    pub fn from_now(span: Duration) -> Self {
        let now = unix_millis(&Utc::now());
        let span = u64::try_from(span.as_millis()).unwrap_or(u64::MAX);
        Self::new(Some(now), Some(now.saturating_add(span)))
    }

    /// Midnight of `date` in `tz`. `None` when midnight does not exist
    /// there (a DST gap).
    pub fn midnight_of<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Option<Self> {
        let midnight = date.and_hms_opt(0, 0, 0)?;
        let local = tz.from_local_datetime(&midnight).earliest()?;
        Some(Self::new(Some(unix_millis(&local)), None))
    }
}

fn unix_millis<Tz: TimeZone>(at: &DateTime<Tz>) -> u64 {
    u64::try_from(at.timestamp_millis()).unwrap_or(0)
}

/// A timestamp installed over the regular one, tagged with who installed
/// it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampOverride {
    pub timestamp: Timestamp,
    pub origin: String,
}

impl TimestampOverride {
    pub fn new(timestamp: Timestamp, origin: impl Into<String>) -> Self {
        Self {
            timestamp,
            origin: origin.into(),
        }
    }
}

/// Regular timestamp plus an optional override. The override wins while
/// present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimestampState {
    base: Option<Timestamp>,
    overridden: Option<TimestampOverride>,
}

impl TimestampState {
    pub fn set_base(&mut self, timestamp: Option<Timestamp>) {
        self.base = timestamp;
    }

    pub fn base(&self) -> Option<Timestamp> {
        self.base
    }

    pub fn set_override(&mut self, timestamp: TimestampOverride) {
        self.overridden = Some(timestamp);
    }

    /// Remove the override only if `origin` installed it.
    pub fn reset_override(&mut self, origin: &str) -> bool {
        if self.override_origin() == Some(origin) {
            self.overridden = None;
            true
        } else {
            false
        }
    }

    pub fn override_origin(&self) -> Option<&str> {
        self.overridden.as_ref().map(|o| o.origin.as_str())
    }

    /// What the presence should show right now
    pub fn effective(&self) -> Option<Timestamp> {
        self.overridden.as_ref().map(|o| o.timestamp).or(self.base)
    }
}

/// Detects calendar day changes by polling at a coarse interval of frame
/// time.
#[derive(Debug, Clone)]
pub struct DayRolloverClock {
    interval: f32,
    elapsed: f32,
    day: Option<NaiveDate>,
}

impl Default for DayRolloverClock {
    fn default() -> Self {
        Self::with_interval(Self::DEFAULT_INTERVAL)
    }
}

impl DayRolloverClock {
    pub const DEFAULT_INTERVAL: f32 = 5.0;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interval(interval: f32) -> Self {
        Self {
            interval,
            elapsed: 0.0,
            day: None,
        }
    }

    /// Accumulate `dt` and, once per interval, compare `today()` with the
    /// day seen last time. Returns true on a change. The first check only
    /// records the day.
    pub fn poll(&mut self, dt: f32, today: impl FnOnce() -> NaiveDate) -> bool {
        self.elapsed += dt;
        if self.elapsed < self.interval {
            return false;
        }
        self.elapsed = 0.0;

        let today = today();
        let changed = self.day.is_some_and(|day| day != today);
        self.day = Some(today);
        changed
    }
}
