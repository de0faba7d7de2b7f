//! 通用类型定义

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

/// API 标识（即 API context，例如 `petstore/v1`）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From)]
#[display("{_0}")]
#[serde(transparent)]
pub struct ApiId(pub String);

impl ApiId {
    /// 规范化 context：去掉首尾的 `/`
    pub fn new(context: impl AsRef<str>) -> Self {
        Self(context.as_ref().trim_matches('/').to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ApiId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// 应用 ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From)]
#[display("{_0}")]
#[serde(transparent)]
pub struct ApplicationId(pub String);

impl ApplicationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ApplicationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// 订阅 ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From)]
#[display("{_0}")]
#[serde(transparent)]
pub struct SubscriptionId(pub String);

impl SubscriptionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SubscriptionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_id_trims_slashes() {
        assert_eq!(ApiId::new("/petstore/v1/").as_str(), "petstore/v1");
        assert_eq!(ApiId::from("petstore/v1"), ApiId::new("/petstore/v1"));
    }

    #[test]
    fn test_ids_display() {
        assert_eq!(ApplicationId::new("app-1").to_string(), "app-1");
        assert_eq!(SubscriptionId::new("sub-9").to_string(), "sub-9");
    }
}
