use deadpool_redis::{Config, Pool, Runtime};
use tracing::info;
use std::time::Duration;

use crate::errors::StoreError;

/// Builds the pool and waits until Redis answers a PING.
pub async fn create_redis_pool(redis_url: &str) -> Result<Pool, StoreError> {
    let pool = Config::from_url(redis_url)
        .create_pool(Some(Runtime::Tokio1))
        .map_err(|e| StoreError::RedisConnection(e.to_string()))?;

    let max_retries = 5;
    let mut retry_count = 0;
    let mut wait_seconds = 2;

    loop {
        match ping(&pool).await {
            Ok(()) => {
                info!("Redis connection established.");
                return Ok(pool);
            }
            Err(e) if retry_count < max_retries => {
                retry_count += 1;
                info!(
                    "Failed to connect to Redis (attempt {}/{}): {}. Retrying in {}s...",
                    retry_count, max_retries, e, wait_seconds);

                tokio::time::sleep(Duration::from_secs(wait_seconds)).await;

                wait_seconds *= 2;
            }
            Err(e) => return Err(e),
        }
    }
}

pub async fn ping(pool: &Pool) -> Result<(), StoreError> {
    let mut conn = pool.get().await?;
    let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
    if pong == "PONG" {
        Ok(())
    } else {
        Err(StoreError::RedisOperation(format!("unexpected PING reply: {pong}")))
    }
}
