use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::{
    entities::rate_limit::{AttemptOutcome, RateLimitPolicy, RateLimitRecord},
    errors::StoreError,
    repositories::rate_limit::RateLimitStore,
};

/// Process-local counters. Only correct for a single instance; use the
/// Redis store when several instances share the traffic.
#[derive(Debug, Default)]
pub struct InMemoryRateLimitStore {
    records: DashMap<String, RateLimitRecord>,
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn record_attempt(
        &self,
        key: &str,
        now: DateTime<Utc>,
        policy: &RateLimitPolicy,
    ) -> Result<AttemptOutcome, StoreError> {
        // The entry guard holds the shard's write lock until it is dropped.
        let mut record = self
            .records
            .entry(key.to_string())
            .or_insert_with(|| RateLimitRecord::new(now));

        let allowed = record.register_attempt(now, policy);

        Ok(AttemptOutcome {
            allowed,
            record: *record,
        })
    }

    async fn get(
        &self,
        key: &str,
        _policy: &RateLimitPolicy,
    ) -> Result<Option<RateLimitRecord>, StoreError> {
        Ok(self.records.get(key).map(|r| *r))
    }

    async fn purge_expired(
        &self,
        now: DateTime<Utc>,
        policy: &RateLimitPolicy,
    ) -> Result<usize, StoreError> {
        let before = self.records.len();
        self.records.retain(|_, record| !record.is_expired(now, policy));
        Ok(before.saturating_sub(self.records.len()))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
