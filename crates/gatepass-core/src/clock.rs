//! Time source for lifecycle decisions.
//!
//! Every timestamp the service writes (`valid_from`, `created_at`,
//! `scanned_at`) and every expiry comparison comes from a [`Clock`], so tests
//! can move time forward without sleeping.

use std::sync::Mutex;

use chrono::{DateTime, Duration, SubsecRound, Utc};

pub trait Clock: Send + Sync {
  /// The current instant, truncated to microseconds (the precision the stores
  /// persist).
  fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
  now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
  pub fn new(start: DateTime<Utc>) -> Self {
    Self { now: Mutex::new(start.trunc_subsecs(6)) }
  }

  /// Start at the current wall-clock time.
  pub fn starting_now() -> Self { Self::new(Utc::now()) }

  pub fn advance(&self, by: Duration) {
    let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
    *now += by;
  }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    *self.now.lock().unwrap_or_else(|e| e.into_inner())
  }
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Timelike};

  use super::*;

  #[test]
  fn manual_clock_moves_only_on_request() {
    let start = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
    let clock = ManualClock::new(start);
    assert_eq!(clock.now(), start);
    clock.advance(Duration::days(7));
    assert_eq!(clock.now(), start + Duration::days(7));
  }

  #[test]
  fn system_clock_truncates_to_micros() {
    let now = SystemClock.now();
    assert_eq!(now.nanosecond() % 1_000, 0);
  }
}
