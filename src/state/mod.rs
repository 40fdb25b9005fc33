// 执行记录存储模块

mod store;

#[cfg(feature = "redis-store")]
pub use store::redis::RedisStore;
pub use store::{ExecutionStore, MemoryStore, DEFAULT_STORE_CAPACITY};
