use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    entities::rate_limit::{AttemptOutcome, RateLimitPolicy, RateLimitRecord},
    errors::StoreError,
};

/// Per-client attempt counters backing the submission gate.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Atomically resets an expired window, checks the budget and counts the
    /// attempt for `key`. Concurrent calls for the same key must never let
    /// more than `policy.max_submissions` attempts through per window.
    async fn record_attempt(
        &self,
        key: &str,
        now: DateTime<Utc>,
        policy: &RateLimitPolicy,
    ) -> Result<AttemptOutcome, StoreError>;

    /// Current record for `key`, if one exists. `policy` must be the one
    /// the attempts were recorded with.
    async fn get(
        &self,
        key: &str,
        policy: &RateLimitPolicy,
    ) -> Result<Option<RateLimitRecord>, StoreError>;

    /// Drops records whose window has run out. Returns how many were removed.
    async fn purge_expired(
        &self,
        now: DateTime<Utc>,
        policy: &RateLimitPolicy,
    ) -> Result<usize, StoreError>;

    fn backend_name(&self) -> &'static str;
}

#[async_trait]
impl<T> RateLimitStore for Arc<T>
where
    T: RateLimitStore + ?Sized,
{
    async fn record_attempt(
        &self,
        key: &str,
        now: DateTime<Utc>,
        policy: &RateLimitPolicy,
    ) -> Result<AttemptOutcome, StoreError> {
        (**self).record_attempt(key, now, policy).await
    }

    async fn get(
        &self,
        key: &str,
        policy: &RateLimitPolicy,
    ) -> Result<Option<RateLimitRecord>, StoreError> {
        (**self).get(key, policy).await
    }

    async fn purge_expired(
        &self,
        now: DateTime<Utc>,
        policy: &RateLimitPolicy,
    ) -> Result<usize, StoreError> {
        (**self).purge_expired(now, policy).await
    }

    fn backend_name(&self) -> &'static str {
        (**self).backend_name()
    }
}
