//! tollgate-adapter-redis - Redis 适配器
//!
//! 多实例共享的计数存储与策略来源

mod connection;
mod counter_store;
mod policy_source;

pub use connection::*;
pub use counter_store::RedisCounterStore;
pub use policy_source::RedisPolicySource;
