//! 进程内计数存储
//!
//! 键到计数器的映射用 `DashMap`（分片锁），每个计数器再有自己的 `Mutex`：
//! 同一键上的「重置 → 比较 → 递增」串行执行，不同键互不阻塞。
//! 计数期间持有分片读锁，清理任务（分片写锁）无法移除正在使用的计数器。
//! 多实例部署时各实例独立计数，配额只是近似值。

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tollgate_domain::{Policy, PolicyKey};
use tollgate_errors::AppResult;
use tollgate_ports::{Acquisition, CounterStore};
use tracing::debug;

#[derive(Debug)]
struct Counter {
    count: u64,
    window_start: Instant,
    window: Duration,
}

impl Counter {
    fn new(now: Instant, window: Duration) -> Self {
        Self {
            count: 0,
            window_start: now,
            window,
        }
    }

    /// 时钟回退时 `saturating_duration_since` 返回 0，窗口不会出现负长度
    fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.window_start)
    }

    fn acquire(&mut self, limit: u64, window: Duration, now: Instant) -> Acquisition {
        self.window = window;
        if self.elapsed(now) >= window {
            self.window_start = now;
            self.count = 0;
        }

        let reset_after = window.saturating_sub(self.elapsed(now));
        if self.count >= limit {
            return Acquisition {
                allowed: false,
                count: self.count,
                reset_after,
            };
        }

        self.count += 1;
        Acquisition {
            allowed: true,
            count: self.count,
            reset_after,
        }
    }
}

/// 进程内固定窗口计数存储
#[derive(Debug, Default)]
pub struct LocalCounterStore {
    counters: DashMap<PolicyKey, Mutex<Counter>>,
}

impl LocalCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    fn acquire(&self, key: &PolicyKey, policy: &Policy, now: Instant) -> Acquisition {
        let (limit, window) = (policy.request_count, policy.window);
        if let Some(slot) = self.counters.get(key) {
            return slot.lock().acquire(limit, window, now);
        }
        self.counters
            .entry(key.clone())
            .or_insert_with(|| Mutex::new(Counter::new(now, window)))
            .lock()
            .acquire(limit, window, now)
    }

    /// 清理窗口结束超过一个窗口长度的计数器
    pub fn evict_expired(&self, now: Instant) -> usize {
        let before = self.counters.len();
        self.counters.retain(|_, slot| {
            let counter = slot.lock();
            counter.elapsed(now) < counter.window.saturating_mul(2)
        });
        let evicted = before.saturating_sub(self.counters.len());
        if evicted > 0 {
            debug!(evicted, remaining = self.counters.len(), "Evicted idle counters");
        }
        evicted
    }

    /// 启动周期清理任务
    pub fn spawn_eviction(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                store.evict_expired(Instant::now());
            }
        })
    }
}

#[async_trait]
impl CounterStore for LocalCounterStore {
    async fn try_acquire(&self, key: &PolicyKey, policy: &Policy, now: Instant) -> AppResult<Acquisition> {
        Ok(self.acquire(key, policy, now))
    }

    fn backend(&self) -> &'static str {
        "local"
    }
}
