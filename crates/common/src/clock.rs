//! 时钟抽象
//!
//! 限流窗口使用单调时钟 (`Instant`)，令牌有效期使用 Unix 时间戳（秒）。

use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// 时钟 trait
pub trait Clock: Send + Sync {
    /// 单调时间，用于窗口计算
    fn now(&self) -> Instant;

    /// 墙钟时间（Unix 秒），用于 exp/nbf/iat 校验
    fn unix_timestamp(&self) -> i64;
}

/// 系统时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn unix_timestamp(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// 手动推进的时钟（测试与回放工具使用）
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    base_unix: i64,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new(base_unix: i64) -> Self {
        Self {
            base: Instant::now(),
            base_unix,
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// 时间前进
    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock()
    }

    fn unix_timestamp(&self) -> i64 {
        self.base_unix + self.offset.lock().as_secs() as i64
    }
}
