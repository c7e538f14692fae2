mod saver;
pub mod storage;
pub mod telemetry;

// Re-export the factory functions and building blocks for easy access
pub use saver::{SavePolicy, StorageSaver};
pub use storage::{MemStorage, PgStorage, RedisStorage, RetryableStorage};
pub use telemetry::{create_noop_telemetry, create_prom_telemetry};
