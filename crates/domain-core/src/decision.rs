//! 准入决策

use crate::policy::PolicyScope;
use crate::rejection::RejectionReason;
use derive_more::Display;
use serde::Serialize;
use std::time::Duration;

/// 拒绝类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenyReason {
    #[display("UNAUTHENTICATED")]
    Unauthenticated,
    #[display("THROTTLED")]
    Throttled,
    #[display("POLICY_STORE_UNAVAILABLE")]
    PolicyStoreUnavailable,
    #[display("COUNTER_STORE_UNAVAILABLE")]
    CounterStoreUnavailable,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Throttled => "THROTTLED",
            Self::PolicyStoreUnavailable => "POLICY_STORE_UNAVAILABLE",
            Self::CounterStoreUnavailable => "COUNTER_STORE_UNAVAILABLE",
        }
    }
}

/// 单次请求的准入决策
///
/// 每个请求恰好产生一个决策。`matched_policy` 只用于日志和指标，
/// 渲染给调用方时必须丢弃。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub allowed: bool,
    pub reason: Option<DenyReason>,
    pub detail: Option<RejectionReason>,
    pub matched_policy: Option<String>,
    pub matched_scope: Option<PolicyScope>,
    /// 触发限流的窗口距离重置的时间
    pub retry_after: Option<Duration>,
}

impl Decision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
            detail: None,
            matched_policy: None,
            matched_scope: None,
            retry_after: None,
        }
    }

    pub fn deny(reason: DenyReason) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
            ..Self::allow()
        }
    }

    /// 缺少凭证
    pub fn unauthenticated() -> Self {
        Self::deny(DenyReason::Unauthenticated)
    }

    /// 令牌校验失败
    pub fn rejected(detail: RejectionReason) -> Self {
        Self {
            detail: Some(detail),
            ..Self::deny(DenyReason::Unauthenticated)
        }
    }

    pub fn throttled(policy: impl Into<String>, scope: PolicyScope, retry_after: Duration) -> Self {
        Self {
            matched_policy: Some(policy.into()),
            matched_scope: Some(scope),
            retry_after: Some(retry_after),
            ..Self::deny(DenyReason::Throttled)
        }
    }

    pub fn is_throttled(&self) -> bool {
        self.reason == Some(DenyReason::Throttled)
    }

    /// 指标标签
    pub fn outcome(&self) -> &'static str {
        if self.allowed { "allowed" } else { "denied" }
    }
}
