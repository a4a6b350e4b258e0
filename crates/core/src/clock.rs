// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling

use chrono::{DateTime, Utc};
#[cfg(any(test, feature = "test-support"))]
use chrono::TimeZone;

/// A clock that provides the current wall-clock time.
///
/// Persisted timestamps (event times, `last_updated`) always come from a
/// `Clock` so tests can pin them.
pub trait Clock: Clone + Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn epoch_ms(&self) -> u64 {
        self.now().timestamp_millis().max(0) as u64
    }
}

/// Real system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fake clock for testing with controllable time
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Clone)]
pub struct FakeClock {
    current: std::sync::Arc<parking_lot::Mutex<DateTime<Utc>>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeClock {
    /// Starts at a fixed epoch (1,000,000 ms) so timestamps are stable.
    pub fn new() -> Self {
        let start = Utc.timestamp_millis_opt(1_000_000).single().unwrap_or_default();
        Self { current: std::sync::Arc::new(parking_lot::Mutex::new(start)) }
    }

    /// Advance the clock by the given duration
    pub fn advance(&self, duration: chrono::Duration) {
        let mut now = self.current.lock();
        *now += duration;
    }

    /// Set the clock to a specific instant
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.current.lock() = instant;
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
