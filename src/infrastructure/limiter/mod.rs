pub mod memory;
pub mod redis_store;

pub use memory::InMemoryRateLimitStore;
pub use redis_store::RedisRateLimitStore;
