//! JWT Claims 与校验后的 ClaimSet

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tollgate_common::{ApiId, ApplicationId, SubscriptionId};

/// 令牌中的应用信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationClaim {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// 应用等级，例如 `Unlimited`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
}

/// 令牌绑定的 API 订阅
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribedApi {
    /// API context，例如 `/petstore/v1`
    pub context: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    /// 订阅等级，例如 `15PerMin`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_tier: Option<String>,
}

/// `aud` 可以是单个字符串或字符串数组
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    #[default]
    None,
    One(String),
    Many(Vec<String>),
}

impl Audience {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn contains(&self, api: &ApiId) -> bool {
        match self {
            Self::None => false,
            Self::One(aud) => ApiId::new(aud) == *api,
            Self::Many(auds) => auds.iter().any(|aud| ApiId::new(aud) == *api),
        }
    }
}

/// JWT Claims（线上格式）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject
    pub sub: String,
    /// Issuer
    pub iss: String,
    /// Expiration time
    pub exp: i64,
    /// Issued at
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Not before
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    /// JWT ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    /// Audience（API context）
    #[serde(default, skip_serializing_if = "Audience::is_none")]
    pub aud: Audience,
    /// 空格分隔的 scope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<ApplicationClaim>,
    #[serde(default, rename = "subscribedAPIs", skip_serializing_if = "Vec::is_empty")]
    pub subscribed_apis: Vec<SubscribedApi>,
    /// PRODUCTION / SANDBOX
    #[serde(default, rename = "keytype", skip_serializing_if = "Option::is_none")]
    pub key_type: Option<String>,
}

impl Claims {
    pub fn new(sub: impl Into<String>, iss: impl Into<String>, exp: i64) -> Self {
        Self {
            sub: sub.into(),
            iss: iss.into(),
            exp,
            iat: None,
            nbf: None,
            jti: Some(uuid::Uuid::now_v7().to_string()),
            aud: Audience::None,
            scope: None,
            application: None,
            subscribed_apis: Vec::new(),
            key_type: None,
        }
    }

    pub fn issued_at(mut self, iat: i64) -> Self {
        self.iat = Some(iat);
        self
    }

    pub fn not_before(mut self, nbf: i64) -> Self {
        self.nbf = Some(nbf);
        self
    }

    pub fn with_audience(mut self, aud: Audience) -> Self {
        self.aud = aud;
        self
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = scopes
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(" ");
        self.scope = Some(joined);
        self
    }

    pub fn with_application(mut self, id: impl Into<String>, tier: Option<&str>) -> Self {
        self.application = Some(ApplicationClaim {
            id: id.into(),
            name: None,
            tier: tier.map(str::to_string),
        });
        self
    }

    pub fn with_subscription(
        mut self,
        context: impl Into<String>,
        subscription_id: Option<&str>,
        tier: Option<&str>,
    ) -> Self {
        self.subscribed_apis.push(SubscribedApi {
            context: context.into(),
            name: None,
            subscription_id: subscription_id.map(str::to_string),
            subscription_tier: tier.map(str::to_string),
        });
        self
    }

    /// 查找与请求 API 匹配的订阅
    pub fn subscription_for(&self, api: &ApiId) -> Option<&SubscribedApi> {
        self.subscribed_apis
            .iter()
            .find(|s| ApiId::new(&s.context) == *api)
    }

    pub fn scopes(&self) -> BTreeSet<String> {
        self.scope
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }
}

/// 当前 API 上的订阅
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundSubscription {
    pub id: SubscriptionId,
    pub tier: Option<String>,
}

/// 校验通过的身份信息
///
/// 只能由 [`crate::TokenVerifier`] 构造。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimSet {
    subject: String,
    issuer: String,
    application: Option<ApplicationId>,
    application_tier: Option<String>,
    subscription: Option<BoundSubscription>,
    expires_at: i64,
    issued_at: Option<i64>,
    scopes: BTreeSet<String>,
}

impl ClaimSet {
    /// 从已验签的 claims 构造，`api` 为令牌已确认绑定的 API
    pub(crate) fn from_verified(claims: Claims, api: &ApiId) -> Self {
        let scopes = claims.scopes();
        let application = claims.application.as_ref().map(|a| ApplicationId::new(a.id.clone()));
        let application_tier = claims.application.as_ref().and_then(|a| a.tier.clone());

        // 订阅未携带 ID 时由 (应用, API) 唯一确定
        let subscription = claims.subscription_for(api).and_then(|s| {
            let id = match (&s.subscription_id, &application) {
                (Some(id), _) => SubscriptionId::new(id.clone()),
                (None, Some(app)) => SubscriptionId::new(format!("{}:{}", app, api)),
                (None, None) => return None,
            };
            Some(BoundSubscription {
                id,
                tier: s.subscription_tier.clone(),
            })
        });

        Self {
            subject: claims.sub,
            issuer: claims.iss,
            application,
            application_tier,
            subscription,
            expires_at: claims.exp,
            issued_at: claims.iat,
            scopes,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn application_id(&self) -> Option<&ApplicationId> {
        self.application.as_ref()
    }

    pub fn application_tier(&self) -> Option<&str> {
        self.application_tier.as_deref()
    }

    pub fn subscription(&self) -> Option<&BoundSubscription> {
        self.subscription.as_ref()
    }

    pub fn subscription_id(&self) -> Option<&SubscriptionId> {
        self.subscription().map(|s| &s.id)
    }

    pub fn subscription_tier(&self) -> Option<&str> {
        self.subscription().and_then(|s| s.tier.as_deref())
    }

    /// 生效等级：订阅等级优先，其次应用等级
    pub fn tier(&self) -> Option<&str> {
        self.subscription_tier().or(self.application_tier())
    }

    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    pub fn issued_at(&self) -> Option<i64> {
        self.issued_at
    }

    pub fn scopes(&self) -> &BTreeSet<String> {
        &self.scopes
    }
}
