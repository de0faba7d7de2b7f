//! 限流策略与计数键

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tollgate_common::{ApiId, ApplicationId, SubscriptionId};

/// 策略作用域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum PolicyScope {
    #[display("api")]
    Api,
    #[display("application")]
    Application,
    #[display("subscription")]
    Subscription,
}

impl PolicyScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Application => "application",
            Self::Subscription => "subscription",
        }
    }

    /// 默认评估顺序：订阅 → API → 应用
    pub fn default_order() -> Vec<PolicyScope> {
        vec![Self::Subscription, Self::Api, Self::Application]
    }
}

/// 计数存储不可用时的处理方式
///
/// `Open` 放行（存在绕过配额的风险），`Closed` 拒绝（分区时不可用）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum CounterFailureMode {
    #[display("open")]
    Open,
    #[default]
    #[display("closed")]
    Closed,
}

/// 单条限流策略（固定窗口）
///
/// 加载后不可变，配置更新时整体替换。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub name: String,
    /// 窗口内允许的请求数，0 表示全部拒绝
    pub request_count: u64,
    /// 窗口长度
    #[serde(rename = "window_secs", with = "duration_secs")]
    pub window: Duration,
    pub scope: PolicyScope,
}

impl Policy {
    pub fn new(name: impl Into<String>, request_count: u64, window: Duration, scope: PolicyScope) -> Self {
        Self {
            name: name.into(),
            request_count,
            window,
            scope,
        }
    }

    /// 是否为封禁策略
    pub fn is_blocking(&self) -> bool {
        self.request_count == 0
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

/// 单次请求的身份三元组
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestIdentity {
    pub api: ApiId,
    pub application: Option<ApplicationId>,
    pub subscription: Option<SubscriptionId>,
}

impl RequestIdentity {
    pub fn new(api: ApiId) -> Self {
        Self {
            api,
            application: None,
            subscription: None,
        }
    }

    pub fn with_application(mut self, application: ApplicationId) -> Self {
        self.application = Some(application);
        self
    }

    pub fn with_subscription(mut self, subscription: SubscriptionId) -> Self {
        self.subscription = Some(subscription);
        self
    }
}

/// 计数键
///
/// 键相同的请求共享同一个计数器。策略名参与键计算，
/// 同一作用域下的多条策略各自计数。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PolicyKey {
    pub scope: PolicyScope,
    pub policy: String,
    pub api: ApiId,
    pub application: Option<ApplicationId>,
    pub subscription: Option<SubscriptionId>,
}

impl PolicyKey {
    /// 按作用域从请求身份派生计数键
    ///
    /// 缺少该作用域所需的标识（例如匿名请求的应用策略）时返回 `None`。
    pub fn derive(policy: &Policy, identity: &RequestIdentity) -> Option<Self> {
        let (application, subscription) = match policy.scope {
            PolicyScope::Api => (None, None),
            PolicyScope::Application => (Some(identity.application.clone()?), None),
            PolicyScope::Subscription => (
                identity.application.clone(),
                Some(identity.subscription.clone()?),
            ),
        };

        Some(Self {
            scope: policy.scope,
            policy: policy.name.clone(),
            api: identity.api.clone(),
            application,
            subscription,
        })
    }
}

impl fmt::Display for PolicyKey {
    /// 存储键格式：`{scope}:{policy}:{api}:{application}:{subscription}`
    ///
    /// 五段固定，缺省段为空；段内的 `%` 与 `:` 转义为 `%25`、`%3A`。
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.scope)?;
        let segments = [
            Some(self.policy.as_str()),
            Some(self.api.as_str()),
            self.application.as_ref().map(|a| a.as_str()),
            self.subscription.as_ref().map(|s| s.as_str()),
        ];
        for segment in segments {
            f.write_str(":")?;
            write_escaped(f, segment.unwrap_or_default())?;
        }
        Ok(())
    }
}

fn write_escaped(f: &mut fmt::Formatter<'_>, segment: &str) -> fmt::Result {
    for c in segment.chars() {
        match c {
            '%' => f.write_str("%25")?,
            ':' => f.write_str("%3A")?,
            c => write!(f, "{}", c)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> RequestIdentity {
        RequestIdentity::new(ApiId::new("petstore/v1"))
            .with_application(ApplicationId::new("app-1"))
            .with_subscription(SubscriptionId::new("sub-1"))
    }

    #[test]
    fn test_api_key_ignores_application() {
        let policy = Policy::new("100PerMin", 100, Duration::from_secs(60), PolicyScope::Api);
        let a = PolicyKey::derive(&policy, &identity()).unwrap();
        let b = PolicyKey::derive(
            &policy,
            &RequestIdentity::new(ApiId::new("petstore/v1"))
                .with_application(ApplicationId::new("app-2")),
        )
        .unwrap();

        assert_eq!(a, b);
        assert_eq!(a.to_string(), "api:100PerMin:petstore/v1::");
    }

    #[test]
    fn test_subscription_key_includes_subscription() {
        let policy = Policy::new("15PerMin", 15, Duration::from_secs(60), PolicyScope::Subscription);
        let key = PolicyKey::derive(&policy, &identity()).unwrap();
        assert_eq!(key.to_string(), "subscription:15PerMin:petstore/v1:app-1:sub-1");
    }

    #[test]
    fn test_storage_keys_are_unambiguous() {
        let policy = Policy::new("15PerMin", 15, Duration::from_secs(60), PolicyScope::Subscription);
        let api = || RequestIdentity::new(ApiId::new("petstore/v1"));

        let split_app = PolicyKey::derive(
            &policy,
            &api()
                .with_application(ApplicationId::new("a"))
                .with_subscription(SubscriptionId::new("b")),
        )
        .unwrap();
        let joined_sub = PolicyKey::derive(&policy, &api().with_subscription(SubscriptionId::new("a:b"))).unwrap();
        let joined_app = PolicyKey::derive(
            &policy,
            &api()
                .with_application(ApplicationId::new("a:"))
                .with_subscription(SubscriptionId::new("b")),
        )
        .unwrap();

        assert_eq!(split_app.to_string(), "subscription:15PerMin:petstore/v1:a:b");
        assert_eq!(joined_sub.to_string(), "subscription:15PerMin:petstore/v1::a%3Ab");
        assert_eq!(joined_app.to_string(), "subscription:15PerMin:petstore/v1:a%3A:b");
        assert_ne!(split_app.to_string(), joined_sub.to_string());
        assert_ne!(split_app.to_string(), joined_app.to_string());
    }

    #[test]
    fn test_application_key_requires_application() {
        let policy = Policy::new("10PerMin", 10, Duration::from_secs(60), PolicyScope::Application);
        let anonymous = RequestIdentity::new(ApiId::new("petstore/v1"));
        assert!(PolicyKey::derive(&policy, &anonymous).is_none());
    }

    #[test]
    fn test_policy_serde_window_secs() {
        let policy: Policy = serde_json::from_str(
            r#"{"name":"15PerMin","request_count":15,"window_secs":60,"scope":"subscription"}"#,
        )
        .unwrap();
        assert_eq!(policy.window, Duration::from_secs(60));
        assert_eq!(policy.scope, PolicyScope::Subscription);
        assert!(!policy.is_blocking());
    }
}
