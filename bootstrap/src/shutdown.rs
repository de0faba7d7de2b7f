//! Graceful Shutdown
//!
//! 后台任务（策略刷新、计数器清理）在 HTTP 服务停止后统一结束。

use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// 后台任务集合
#[derive(Default)]
pub struct BackgroundTasks {
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &'static str, handle: JoinHandle<()>) {
        self.tasks.push((name, handle));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// 取消所有任务并在 `grace` 内等待其退出
    pub async fn shutdown(self, grace: Duration) {
        for (name, handle) in self.tasks {
            handle.abort();
            match tokio::time::timeout(grace, handle).await {
                Ok(Err(e)) if e.is_panic() => warn!(task = name, "Background task panicked"),
                Ok(_) => info!(task = name, "Background task stopped"),
                Err(_) => warn!(task = name, "Background task did not stop in time"),
            }
        }
    }
}
