//! CounterStore trait 定义

use async_trait::async_trait;
use std::time::{Duration, Instant};
use tollgate_domain::{Policy, PolicyKey};
use tollgate_errors::AppResult;

/// 一次配额获取的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acquisition {
    /// 是否获得配额（计数已 +1）
    pub allowed: bool,
    /// 操作后的窗口计数
    pub count: u64,
    /// 当前窗口剩余时间
    pub reset_after: Duration,
}

/// 计数存储
///
/// `try_acquire` 必须对单个键原子地完成「窗口过期重置 → 比较 → 递增」。
/// 只有确认未超限时才递增，不允许先递增再回滚。
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// 尝试为 `key` 获取一个配额
    async fn try_acquire(&self, key: &PolicyKey, policy: &Policy, now: Instant)
        -> AppResult<Acquisition>;

    /// 后端名称（日志与健康检查）
    fn backend(&self) -> &'static str;
}
