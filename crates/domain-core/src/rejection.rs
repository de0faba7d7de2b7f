//! 认证拒绝原因

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// 令牌校验失败的原因
///
/// 全部为终态失败，调用方不应重试同一个令牌。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionReason {
    /// 无法解析为 header/claims/signature 三段
    #[display("MALFORMED")]
    Malformed,
    /// 签名无法通过签发方密钥校验（含未知签发方、不允许的算法）
    #[display("INVALID_SIGNATURE")]
    InvalidSignature,
    /// 已过期
    #[display("EXPIRED")]
    Expired,
    /// nbf/iat 在未来
    #[display("NOT_YET_VALID")]
    NotYetValid,
    /// 令牌未绑定到请求的 API
    #[display("SCOPE_MISMATCH")]
    ScopeMismatch,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Malformed => "MALFORMED",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::Expired => "EXPIRED",
            Self::NotYetValid => "NOT_YET_VALID",
            Self::ScopeMismatch => "SCOPE_MISMATCH",
        }
    }
}
