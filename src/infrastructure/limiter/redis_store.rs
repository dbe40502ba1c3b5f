use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use deadpool_redis::Pool;
use once_cell::sync::Lazy;
use redis::{AsyncCommands, Script};

use crate::{
    entities::rate_limit::{AttemptOutcome, RateLimitPolicy, RateLimitRecord},
    errors::StoreError,
    repositories::rate_limit::RateLimitStore,
};

/// Returns `{allowed, count, pttl}`. A refused attempt does not touch the key.
static ATTEMPT_SCRIPT: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
        local count = tonumber(redis.call('GET', KEYS[1]) or '0')
        if count >= tonumber(ARGV[1]) then
            return {0, count, redis.call('PTTL', KEYS[1])}
        end
        count = redis.call('INCR', KEYS[1])
        if count == 1 then
            redis.call('PEXPIRE', KEYS[1], ARGV[2])
        end
        return {1, count, redis.call('PTTL', KEYS[1])}
        "#,
    )
});

/// Counters shared by every instance. The window is the key's TTL, so
/// expiry runs on the Redis clock rather than the `now` passed in.
#[derive(Clone)]
pub struct RedisRateLimitStore {
    pool: Pool,
    prefix: String,
}

impl RedisRateLimitStore {
    pub fn new(pool: Pool, prefix: impl Into<String>) -> Self {
        RedisRateLimitStore {
            pool,
            prefix: prefix.into(),
        }
    }

    /// Client keys come from request headers, so keep them key-safe.
    fn redis_key(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, urlencoding::encode(key))
    }

    /// Rebuilds a record from the counter and its remaining TTL.
    fn to_record(count: i64, pttl_ms: i64, now: DateTime<Utc>, policy: &RateLimitPolicy) -> RateLimitRecord {
        // PTTL is -1 without expiry and -2 for a missing key.
        let remaining = Duration::try_milliseconds(pttl_ms.max(0))
            .unwrap_or(Duration::zero())
            .min(policy.window);

        RateLimitRecord {
            count: count.clamp(0, u32::MAX as i64) as u32,
            window_start: now
                .checked_sub_signed(policy.window - remaining)
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
        }
    }

    fn to_outcome(
        reply: (i64, i64, i64),
        now: DateTime<Utc>,
        policy: &RateLimitPolicy,
    ) -> Result<AttemptOutcome, StoreError> {
        let (allowed, count, pttl) = reply;

        if !(0..=1).contains(&allowed) {
            return Err(StoreError::Corrupt(format!("attempt script returned {allowed}")));
        }
        if count < 0 {
            return Err(StoreError::Corrupt(format!("negative attempt count {count}")));
        }

        Ok(AttemptOutcome {
            allowed: allowed == 1,
            record: Self::to_record(count, pttl, now, policy),
        })
    }
}

#[async_trait]
impl RateLimitStore for RedisRateLimitStore {
    async fn record_attempt(
        &self,
        key: &str,
        now: DateTime<Utc>,
        policy: &RateLimitPolicy,
    ) -> Result<AttemptOutcome, StoreError> {
        let mut conn = self.pool.get().await?;

        let reply: (i64, i64, i64) = ATTEMPT_SCRIPT
            .key(self.redis_key(key))
            .arg(policy.max_submissions)
            .arg(policy.window.num_milliseconds().max(1))
            .invoke_async(&mut conn)
            .await?;

        Self::to_outcome(reply, now, policy)
    }

    async fn get(
        &self,
        key: &str,
        policy: &RateLimitPolicy,
    ) -> Result<Option<RateLimitRecord>, StoreError> {
        let mut conn = self.pool.get().await?;
        let redis_key = self.redis_key(key);

        let count: Option<i64> = conn.get(&redis_key).await?;
        let Some(count) = count else {
            return Ok(None);
        };
        let pttl: i64 = conn.pttl(&redis_key).await?;

        Ok(Some(Self::to_record(count, pttl, Utc::now(), policy)))
    }

    async fn purge_expired(
        &self,
        _now: DateTime<Utc>,
        _policy: &RateLimitPolicy,
    ) -> Result<usize, StoreError> {
        Ok(0)
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
