mod memory;
mod postgres;
mod redis;
mod retryable;

pub use memory::MemStorage;
pub use postgres::{is_retryable_error as is_retryable_pg_error, PgStorage};
pub use redis::{is_retryable_error as is_retryable_redis_error, RedisStorage};
pub use retryable::RetryableStorage;
