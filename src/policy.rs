//! Refresh policy and time source.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::SECONDS_PER_DAY;

/// Returns true once a snapshot refreshed at `last_refresh` has outlived
/// `interval_seconds` at time `now`.
///
/// The boundary `now == last_refresh + interval_seconds` is still fresh.
pub fn is_stale(last_refresh: u64, now: u64, interval_seconds: u64) -> bool {
    now > last_refresh.saturating_add(interval_seconds)
}

/// Age-based staleness rule with a fixed interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    interval_seconds: u64,
}

impl RefreshPolicy {
    /// Policy refreshing every `refresh_days` days.
    pub fn from_days(refresh_days: u64) -> Self {
        Self::from_seconds(refresh_days.saturating_mul(SECONDS_PER_DAY))
    }

    pub fn from_seconds(interval_seconds: u64) -> Self {
        Self { interval_seconds }
    }

    pub fn interval_seconds(&self) -> u64 {
        self.interval_seconds
    }

    pub fn is_stale(&self, last_refresh: u64, now: u64) -> bool {
        is_stale(last_refresh, now, self.interval_seconds)
    }

    /// Epoch second after which a snapshot refreshed at `last_refresh` is stale.
    pub fn next_refresh_due(&self, last_refresh: u64) -> u64 {
        last_refresh.saturating_add(self.interval_seconds)
    }
}

/// Source of "now" in whole epoch seconds.
pub trait Clock: Send + Sync {
    fn now_epoch_seconds(&self) -> u64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_seconds(&self) -> u64 {
        // A clock set before 1970 reads as 0, which only ever forces a refresh.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}
