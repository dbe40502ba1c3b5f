use chrono::Utc;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::{entities::rate_limit::RateLimitPolicy, repositories::rate_limit::RateLimitStore};

/// Keeps the rate limit table from growing without bound by dropping
/// records whose window has run out.
pub async fn start_sweep_task<S>(store: S, policy: RateLimitPolicy, every: Duration)
where
    S: RateLimitStore,
{
    let mut interval = interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        match store.purge_expired(Utc::now(), &policy).await {
            Ok(0) => {}
            Ok(count) => tracing::info!("Purged {} expired rate limit records", count),
            Err(e) => tracing::error!("Rate limit sweep failed: {}", e)
        }
    }
}
