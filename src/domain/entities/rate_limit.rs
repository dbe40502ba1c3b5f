use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::constants::{DEFAULT_MAX_SUBMISSIONS, DEFAULT_WINDOW_SECS};

/// How many attempts a client may make per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_submissions: u32,
    pub window: Duration,
}

impl RateLimitPolicy {
    /// Windows too long for a [`Duration`] are capped at [`Duration::MAX`].
    pub fn new(max_submissions: u32, window_secs: u64) -> Self {
        let window = i64::try_from(window_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);

        RateLimitPolicy {
            max_submissions,
            window,
        }
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        RateLimitPolicy::new(DEFAULT_MAX_SUBMISSIONS, DEFAULT_WINDOW_SECS)
    }
}

/// Attempts seen from one client key in the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitRecord {
    pub count: u32,
    pub window_start: DateTime<Utc>,
}

impl RateLimitRecord {
    pub fn new(now: DateTime<Utc>) -> Self {
        RateLimitRecord {
            count: 0,
            window_start: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>, policy: &RateLimitPolicy) -> bool {
        now.signed_duration_since(self.window_start) >= policy.window
    }

    /// Applies one attempt. Resets the window first if it has run out, then
    /// counts the attempt unless the budget is already spent. A refused
    /// attempt leaves the record untouched.
    pub fn register_attempt(&mut self, now: DateTime<Utc>, policy: &RateLimitPolicy) -> bool {
        if self.is_expired(now, policy) {
            self.count = 0;
            self.window_start = now;
        }

        if self.count >= policy.max_submissions {
            return false;
        }

        self.count += 1;
        true
    }

    pub fn remaining(&self, policy: &RateLimitPolicy) -> u32 {
        policy.max_submissions.saturating_sub(self.count)
    }

    /// Time until the window resets, `None` once it already has.
    pub fn retry_after(&self, now: DateTime<Utc>, policy: &RateLimitPolicy) -> Option<StdDuration> {
        self.window_start
            .checked_add_signed(policy.window)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
            .signed_duration_since(now)
            .to_std()
            .ok()
            .filter(|d| !d.is_zero())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptOutcome {
    pub allowed: bool,
    pub record: RateLimitRecord,
}
