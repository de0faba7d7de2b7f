//! PolicySource trait 定义

use async_trait::async_trait;
use tollgate_domain::PolicyDocument;
use tollgate_errors::AppResult;

/// 策略来源（控制面下发的配置）
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait PolicySource: Send + Sync {
    /// 拉取当前完整的策略文档
    async fn fetch(&self) -> AppResult<PolicyDocument>;

    /// 来源描述（日志）
    fn describe(&self) -> String;
}
