//! tollgate-quota - 策略存储与配额执行
//!
//! - [`PolicyStore`]: 快照 + 原子替换的策略查询
//! - [`LocalCounterStore`]: 进程内按键加锁的固定窗口计数
//! - [`QuotaEnforcer`]: 按顺序评估多作用域策略
//! - [`PolicyRefresher`]: 从策略来源周期性重建快照

pub mod enforcer;
pub mod local;
pub mod refresh;
pub mod store;

pub use enforcer::QuotaEnforcer;
pub use local::LocalCounterStore;
pub use refresh::PolicyRefresher;
pub use store::{PolicySnapshot, PolicyStore, TierHints};
