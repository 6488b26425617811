//! Wall-clock access and day arithmetic.
//!
//! The engine never reads the system time directly: `SaveSlot::update`
//! asks a `Clock`, and tests pass a `FixedClock` (or call `update_at`).

use crate::{
    error::{SimError, SimResult},
    types::{Day, Timestamp},
};

pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// The real UTC clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        chrono::Utc::now().timestamp()
    }
}

/// A clock frozen at a given instant. Used in tests and tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

/// `(timestamp - first_touch) div day_length`, floored at day 0.
///
/// Timestamps before `first_touch` map to day 0 rather than a negative day.
pub fn day_number(first_touch: Timestamp, day_length: u64, timestamp: Timestamp) -> SimResult<Day> {
    if day_length == 0 {
        return Err(SimError::InvalidDayLength);
    }
    let elapsed = timestamp.saturating_sub(first_touch).max(0) as u64;
    Ok(elapsed / day_length)
}

/// Render a timestamp as `YYYY-MM-DD HH:MM:SS (UTC)`.
pub fn format_utc(timestamp: Timestamp) -> String {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S (UTC)").to_string())
        .unwrap_or_else(|| format!("@{timestamp}"))
}
