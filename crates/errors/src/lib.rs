//! tollgate-errors - 统一错误处理
//!
//! 基于 RFC 7807 Problem Details 规范。准入结果（放行/拒绝）不是错误，
//! 这里只描述基础设施与配置层面的失败。

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Policy store unavailable: {0}")]
    PolicyStoreUnavailable(String),

    #[error("Counter store unavailable: {0}")]
    CounterStoreUnavailable(String),
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn external_service(msg: impl Into<String>) -> Self {
        Self::ExternalService(msg.into())
    }

    pub fn policy_store_unavailable(msg: impl Into<String>) -> Self {
        Self::PolicyStoreUnavailable(msg.into())
    }

    pub fn counter_store_unavailable(msg: impl Into<String>) -> Self {
        Self::CounterStoreUnavailable(msg.into())
    }

    /// 转换为 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::Configuration(_) => 500,
            Self::Internal(_) => 500,
            Self::ExternalService(_) => 502,
            Self::PolicyStoreUnavailable(_) => 503,
            Self::CounterStoreUnavailable(_) => 503,
        }
    }

    /// 转换为 Problem Details
    ///
    /// `detail` 只包含对外安全的标题，内部原因（键名、策略名）留在日志中。
    pub fn to_problem_details(&self) -> ProblemDetails {
        ProblemDetails {
            r#type: self.problem_type(),
            title: self.problem_title(),
            status: self.status_code(),
            detail: self.problem_title(),
            instance: None,
        }
    }

    fn problem_type(&self) -> String {
        let slug = match self {
            Self::NotFound(_) => "not-found",
            Self::Validation(_) => "validation",
            Self::Configuration(_) => "configuration",
            Self::Internal(_) => "internal",
            Self::ExternalService(_) => "external-service",
            Self::PolicyStoreUnavailable(_) => "policy-store-unavailable",
            Self::CounterStoreUnavailable(_) => "counter-store-unavailable",
        };
        format!("https://tollgate.dev/problems/{}", slug)
    }

    fn problem_title(&self) -> String {
        match self {
            Self::NotFound(_) => "Resource Not Found".to_string(),
            Self::Validation(_) => "Validation Error".to_string(),
            Self::Configuration(_) => "Configuration Error".to_string(),
            Self::Internal(_) => "Internal Server Error".to_string(),
            Self::ExternalService(_) => "External Service Error".to_string(),
            Self::PolicyStoreUnavailable(_) => "Policy Store Unavailable".to_string(),
            Self::CounterStoreUnavailable(_) => "Counter Store Unavailable".to_string(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Validation(format!("Invalid JSON: {}", err))
    }
}

/// RFC 7807 Problem Details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemDetails {
    pub r#type: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

/// Result 类型别名
pub type AppResult<T> = Result<T, AppError>;
