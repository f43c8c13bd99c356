//! Windowed admission state for one (group, quota) pair.
//!
//! A bucket counts admissions in tumbling windows of the quota's duration,
//! aligned to the UNIX epoch. Alongside the window count it keeps an
//! approximate arrival rate, resampled at most once per second. With
//! hysteresis enabled, a bucket that closed during a window stays closed across
//! window boundaries for as long as that measured rate is above the
//! sustainable rate `bucket_size / duration`.
//!
//! # Numeric policy
//!
//! Rates are real-valued: the rate limit is `bucket_size as f64 / duration`,
//! and a sample is `count / elapsed_secs` taken once `elapsed >= 1s`. A bucket
//! is held closed only while its rate is strictly above the limit.

use crate::domain::quota::Capacity;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const RATE_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Admission state within the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    /// Admitting; holds the number of records admitted this window.
    Open(u64),
    /// Exhausted; rejects until a window boundary reopens it.
    Closed,
}

/// What happened at a window boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowTransition {
    /// The window rolled over and the count was cleared.
    Reset,
    /// A closed bucket was cleared at the boundary.
    Reopened,
    /// The period elapsed but the bucket stays closed because its measured rate
    /// is still above the limit.
    Held,
}

/// Result of one admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Consumption {
    pub admitted: bool,
    /// Set when this attempt crossed a window boundary.
    pub transition: Option<WindowTransition>,
}

/// Rate figures describing a bucket, used in breach and cooldown reports.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateSummary {
    /// Observed records per second.
    pub rate_s: f64,
    /// Window length in seconds.
    pub period_s: u64,
    /// Records admitted per window, `None` if unlimited.
    pub limit: Option<u64>,
    /// Sustainable records per second, `None` if unlimited.
    pub rate_limit_s: Option<f64>,
}

/// Read-only view of a bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketSnapshot {
    pub capacity: Capacity,
    pub state: WindowState,
    /// Attempts (admitted and rejected) in the current window.
    pub count_total: u64,
    pub approx_rate_per_second: f64,
    pub window_start: SystemTime,
    pub last_warning: Option<SystemTime>,
}

impl BucketSnapshot {
    /// View of an unlimited allowance, which never holds state.
    pub fn unlimited(now: SystemTime) -> Self {
        Self {
            capacity: Capacity::Unlimited,
            state: WindowState::Open(0),
            count_total: 0,
            approx_rate_per_second: 0.0,
            window_start: now,
            last_warning: None,
        }
    }
}

/// Mutable rate-limiting state for one group under one quota.
#[derive(Debug, Clone)]
pub struct Bucket {
    capacity: Capacity,
    period_secs: u64,
    hysteresis: bool,
    state: WindowState,
    count_total: u64,
    window_start: SystemTime,
    approx_rate_per_second: f64,
    rate_window_start: SystemTime,
    rate_window_count: u64,
    last_warning: Option<SystemTime>,
}

impl Bucket {
    /// Create an open, empty bucket whose first window starts at `now`.
    pub fn new(capacity: Capacity, duration: Duration, hysteresis: bool, now: SystemTime) -> Self {
        Self {
            capacity,
            period_secs: duration.as_secs(),
            hysteresis,
            state: WindowState::Open(0),
            count_total: 0,
            window_start: now,
            approx_rate_per_second: 0.0,
            rate_window_start: now,
            rate_window_count: 0,
            last_warning: None,
        }
    }

    /// Record one arrival and decide whether it is admitted.
    pub fn try_consume(&mut self, now: SystemTime) -> bool {
        self.consume(now).admitted
    }

    /// Like [`try_consume`](Self::try_consume), also reporting window
    /// transitions.
    ///
    /// Unlimited buckets admit without touching any state.
    pub fn consume(&mut self, now: SystemTime) -> Consumption {
        let Capacity::Limited(limit) = self.capacity else {
            return Consumption {
                admitted: true,
                transition: None,
            };
        };

        self.rate_window_count += 1;
        self.sample_rate(now);

        let transition = if self.window_index(now) > self.window_index(self.window_start) {
            Some(self.roll_window(now))
        } else {
            None
        };

        // Counted after any reset, so a new window's first record totals 1.
        self.count_total += 1;

        let admitted = match self.state {
            WindowState::Open(count) if count < limit => {
                self.state = WindowState::Open(count + 1);
                true
            }
            _ => {
                self.state = WindowState::Closed;
                false
            }
        };

        Consumption {
            admitted,
            transition,
        }
    }

    /// True once the bucket has seen no window reset and no rate sample for
    /// more than twice the period.
    ///
    /// A held bucket under a steady flood keeps sampling its rate, so it does
    /// not expire merely because its window start is old.
    pub fn expired(&self, now: SystemTime) -> bool {
        elapsed(self.last_activity(), now) > self.stale_after()
    }

    /// Inactivity after which the bucket may be evicted.
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.period_secs.saturating_mul(2))
    }

    /// Sustainable records per second, `None` if unlimited or zero-length.
    pub fn rate_per_second_limit(&self) -> Option<f64> {
        match self.capacity {
            Capacity::Limited(limit) if self.period_secs > 0 => {
                Some(limit as f64 / self.period_secs as f64)
            }
            _ => None,
        }
    }

    pub fn state(&self) -> WindowState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == WindowState::Closed
    }

    pub fn approx_rate_per_second(&self) -> f64 {
        self.approx_rate_per_second
    }

    pub fn uses_hysteresis(&self) -> bool {
        self.hysteresis
    }

    /// Whether a breach warning is due: none was issued yet, or the last one is
    /// at least `delay` old.
    pub fn should_warn(&self, now: SystemTime, delay: Duration) -> bool {
        match self.last_warning {
            None => true,
            Some(at) => elapsed(at, now) >= delay,
        }
    }

    pub fn mark_warned(&mut self, now: SystemTime) {
        self.last_warning = Some(now);
    }

    /// Observed rate and configured limits at `now`.
    ///
    /// The observed rate is the larger of the window average and the sampled
    /// approximate rate. Within the first second of a window the window average
    /// is the raw attempt count.
    pub fn rate_summary(&self, now: SystemTime) -> RateSummary {
        let since_reset = elapsed(self.window_start, now).as_secs_f64();
        let window_rate = if since_reset >= 1.0 {
            self.count_total as f64 / since_reset
        } else {
            self.count_total as f64
        };

        RateSummary {
            rate_s: window_rate.max(self.approx_rate_per_second),
            period_s: self.period_secs,
            limit: self.capacity.limit(),
            rate_limit_s: self.rate_per_second_limit(),
        }
    }

    pub fn snapshot(&self) -> BucketSnapshot {
        BucketSnapshot {
            capacity: self.capacity,
            state: self.state,
            count_total: self.count_total,
            approx_rate_per_second: self.approx_rate_per_second,
            window_start: self.window_start,
            last_warning: self.last_warning,
        }
    }

    fn sample_rate(&mut self, now: SystemTime) {
        let since = elapsed(self.rate_window_start, now);
        if since >= RATE_SAMPLE_INTERVAL {
            self.approx_rate_per_second = self.rate_window_count as f64 / since.as_secs_f64();
            self.rate_window_start = now;
            self.rate_window_count = 0;
        }
    }

    fn roll_window(&mut self, now: SystemTime) -> WindowTransition {
        let was_closed = self.is_closed();
        if self.hysteresis && was_closed && self.rate_above_limit() {
            return WindowTransition::Held;
        }

        self.state = WindowState::Open(0);
        self.count_total = 0;
        self.window_start = now;

        if was_closed {
            WindowTransition::Reopened
        } else {
            WindowTransition::Reset
        }
    }

    fn last_activity(&self) -> SystemTime {
        self.window_start.max(self.rate_window_start)
    }

    fn rate_above_limit(&self) -> bool {
        self.rate_per_second_limit()
            .is_some_and(|limit| self.approx_rate_per_second > limit)
    }

    fn window_index(&self, at: SystemTime) -> u64 {
        let secs = at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        secs / self.period_secs.max(1)
    }
}

/// Time from `earlier` to `now`, zero if the clock went backwards.
fn elapsed(earlier: SystemTime, now: SystemTime) -> Duration {
    now.duration_since(earlier).unwrap_or(Duration::ZERO)
}
