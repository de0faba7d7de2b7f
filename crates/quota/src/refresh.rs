//! 策略刷新
//!
//! 周期性从策略来源拉取文档，重建快照并原子替换；
//! 拉取或校验失败时保留上一个可用快照。

use crate::store::PolicyStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tollgate_errors::AppResult;
use tollgate_ports::PolicySource;
use tracing::{debug, warn};

/// 策略刷新器
#[derive(Clone)]
pub struct PolicyRefresher {
    source: Arc<dyn PolicySource>,
    store: Arc<PolicyStore>,
}

impl PolicyRefresher {
    pub fn new(source: Arc<dyn PolicySource>, store: Arc<PolicyStore>) -> Self {
        Self { source, store }
    }

    /// 拉取一次并发布，返回新快照的版本号
    pub async fn refresh_once(&self) -> AppResult<u64> {
        let doc = self.source.fetch().await?;
        let version = self.store.replace(&doc)?;
        debug!(source = %self.source.describe(), version, "Policy snapshot refreshed");
        Ok(version)
    }

    /// 启动后台刷新任务
    pub fn spawn(self, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // 第一次 tick 立即返回，启动时已经加载过
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = self.refresh_once().await {
                    warn!(
                        error = %e,
                        source = %self.source.describe(),
                        "Failed to refresh policies, keeping last good snapshot"
                    );
                    metrics::counter!("tollgate_policy_refresh_failures_total").increment(1);
                }
            }
        })
    }
}
