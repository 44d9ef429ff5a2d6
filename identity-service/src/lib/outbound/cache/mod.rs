pub mod memory;
pub mod redis;

pub use self::memory::InMemoryKeyValueStore;
pub use self::redis::RedisKeyValueStore;
