//! 策略存储
//!
//! 读多写少：每个版本的策略构建为不可变快照，通过 `ArcSwapOption` 原子发布，
//! 查询方只做一次无锁 load。

use arc_swap::ArcSwapOption;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tollgate_common::{ApiId, ApplicationId, SubscriptionId};
use tollgate_domain::{Policy, PolicyDocument, PolicyScope, RequestIdentity};
use tollgate_errors::{AppError, AppResult};
use tracing::{debug, info};

/// 令牌携带的等级名称
///
/// 应用或订阅没有显式绑定时，以等级名作为策略名查找。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TierHints {
    pub application: Option<String>,
    pub subscription: Option<String>,
}

/// 某个版本的策略快照
#[derive(Debug, Default)]
pub struct PolicySnapshot {
    version: u64,
    policies: HashMap<String, Arc<Policy>>,
    api: HashMap<ApiId, Vec<Arc<Policy>>>,
    application: HashMap<ApplicationId, Vec<Arc<Policy>>>,
    subscription: HashMap<SubscriptionId, Vec<Arc<Policy>>>,
}

impl PolicySnapshot {
    /// 从策略文档构建快照
    ///
    /// 窗口为 0 或绑定引用了未定义的策略时拒绝整个文档。
    pub fn build(doc: &PolicyDocument) -> AppResult<Self> {
        let mut policies = HashMap::with_capacity(doc.policies.len());
        for policy in doc.policies() {
            if policy.window.is_zero() {
                return Err(AppError::validation(format!(
                    "Policy {} has a zero-length window",
                    policy.name
                )));
            }
            policies.insert(policy.name.clone(), Arc::new(policy));
        }

        let lookup = |names: &Vec<String>| -> AppResult<Vec<Arc<Policy>>> {
            names
                .iter()
                .map(|name| {
                    policies.get(name).cloned().ok_or_else(|| {
                        AppError::validation(format!("Binding references undefined policy {}", name))
                    })
                })
                .collect()
        };

        let mut api = HashMap::new();
        for (id, names) in &doc.bindings.api {
            api.insert(ApiId::new(id), lookup(names)?);
        }
        let mut application = HashMap::new();
        for (id, names) in &doc.bindings.application {
            application.insert(ApplicationId::new(id.clone()), lookup(names)?);
        }
        let mut subscription = HashMap::new();
        for (id, names) in &doc.bindings.subscription {
            subscription.insert(SubscriptionId::new(id.clone()), lookup(names)?);
        }

        Ok(Self {
            version: doc.version,
            policies,
            api,
            application,
            subscription,
        })
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn policy(&self, name: &str) -> Option<&Arc<Policy>> {
        self.policies.get(name)
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

/// 策略存储
pub struct PolicyStore {
    current: ArcSwapOption<PolicySnapshot>,
    order: Vec<PolicyScope>,
    unlimited_tiers: HashSet<String>,
}

impl PolicyStore {
    /// 创建空存储（首次发布快照前查询会失败关闭）
    pub fn new(order: Vec<PolicyScope>, unlimited_tiers: impl IntoIterator<Item = String>) -> Self {
        Self {
            current: ArcSwapOption::empty(),
            order,
            unlimited_tiers: unlimited_tiers.into_iter().collect(),
        }
    }

    /// 发布新快照
    pub fn publish(&self, snapshot: PolicySnapshot) {
        info!(
            version = snapshot.version,
            policies = snapshot.len(),
            "Publishing policy snapshot"
        );
        metrics::gauge!("tollgate_policy_snapshot_version").set(snapshot.version as f64);
        self.current.store(Some(Arc::new(snapshot)));
    }

    /// 构建并发布；构建失败时保留旧快照
    pub fn replace(&self, doc: &PolicyDocument) -> AppResult<u64> {
        let snapshot = PolicySnapshot::build(doc)?;
        let version = snapshot.version;
        self.publish(snapshot);
        Ok(version)
    }

    pub fn snapshot(&self) -> Option<Arc<PolicySnapshot>> {
        self.current.load_full()
    }

    pub fn is_ready(&self) -> bool {
        self.current.load().is_some()
    }

    pub fn order(&self) -> &[PolicyScope] {
        &self.order
    }

    /// 查询请求适用的策略，按作用域顺序排列
    ///
    /// 空结果表示不限流。
    pub fn resolve(&self, identity: &RequestIdentity, tiers: &TierHints) -> AppResult<Vec<Arc<Policy>>> {
        let snapshot = self
            .current
            .load_full()
            .ok_or_else(|| AppError::policy_store_unavailable("No policy snapshot has been loaded"))?;

        let mut resolved: Vec<Arc<Policy>> = Vec::new();

        if let Some(bound) = snapshot.api.get(&identity.api) {
            resolved.extend(bound.iter().cloned());
        }

        if let Some(app) = &identity.application {
            match snapshot.application.get(app) {
                Some(bound) => resolved.extend(bound.iter().cloned()),
                None => resolved.extend(self.tier_policy(&snapshot, tiers.application.as_deref())?),
            }
        }

        if let Some(sub) = &identity.subscription {
            match snapshot.subscription.get(sub) {
                Some(bound) => resolved.extend(bound.iter().cloned()),
                None => resolved.extend(self.tier_policy(&snapshot, tiers.subscription.as_deref())?),
            }
        }

        let mut seen = HashSet::new();
        resolved.retain(|p| seen.insert(p.name.clone()));
        resolved.sort_by_key(|p| self.rank(p.scope));

        debug!(
            api = %identity.api,
            version = snapshot.version,
            count = resolved.len(),
            "Resolved policies"
        );
        Ok(resolved)
    }

    fn tier_policy(&self, snapshot: &PolicySnapshot, tier: Option<&str>) -> AppResult<Option<Arc<Policy>>> {
        let Some(tier) = tier else {
            return Ok(None);
        };
        if tier.is_empty() || self.unlimited_tiers.contains(tier) {
            return Ok(None);
        }
        snapshot
            .policy(tier)
            .cloned()
            .map(Some)
            .ok_or_else(|| AppError::policy_store_unavailable(format!("Unknown tier policy {}", tier)))
    }

    fn rank(&self, scope: PolicyScope) -> usize {
        self.order
            .iter()
            .position(|s| *s == scope)
            .unwrap_or(self.order.len())
    }
}

impl Default for PolicyStore {
    fn default() -> Self {
        Self::new(PolicyScope::default_order(), ["Unlimited".to_string()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tollgate_domain::{PolicyBindings, PolicySpec};

    fn spec(request_count: u64, scope: PolicyScope) -> PolicySpec {
        PolicySpec {
            request_count,
            window_secs: 60,
            scope,
        }
    }

    fn document() -> PolicyDocument {
        let mut policies = BTreeMap::new();
        policies.insert("100PerMin".to_string(), spec(100, PolicyScope::Api));
        policies.insert("15PerMin".to_string(), spec(15, PolicyScope::Subscription));
        policies.insert("50PerMin".to_string(), spec(50, PolicyScope::Application));

        let mut bindings = PolicyBindings::default();
        bindings
            .api
            .insert("petstore/v1".to_string(), vec!["100PerMin".to_string()]);
        bindings
            .application
            .insert("app-1".to_string(), vec!["50PerMin".to_string()]);
        bindings
            .subscription
            .insert("sub-1".to_string(), vec!["15PerMin".to_string()]);

        PolicyDocument {
            version: 7,
            policies,
            bindings,
        }
    }

    fn identity() -> RequestIdentity {
        RequestIdentity::new(ApiId::new("petstore/v1"))
            .with_application(ApplicationId::new("app-1"))
            .with_subscription(SubscriptionId::new("sub-1"))
    }

    fn names(policies: &[Arc<Policy>]) -> Vec<&str> {
        policies.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_resolve_before_load_fails_closed() {
        let store = PolicyStore::default();
        let err = store.resolve(&identity(), &TierHints::default()).unwrap_err();
        assert!(matches!(err, AppError::PolicyStoreUnavailable(_)));
        assert!(!store.is_ready());
    }

    #[test]
    fn test_resolve_default_order() {
        let store = PolicyStore::default();
        store.replace(&document()).unwrap();

        let resolved = store.resolve(&identity(), &TierHints::default()).unwrap();
        assert_eq!(names(&resolved), vec!["15PerMin", "100PerMin", "50PerMin"]);
    }

    #[test]
    fn test_resolve_custom_order() {
        let store = PolicyStore::new(
            vec![PolicyScope::Application, PolicyScope::Api, PolicyScope::Subscription],
            Vec::new(),
        );
        store.replace(&document()).unwrap();

        let resolved = store.resolve(&identity(), &TierHints::default()).unwrap();
        assert_eq!(names(&resolved), vec!["50PerMin", "100PerMin", "15PerMin"]);
    }

    #[test]
    fn test_resolve_unconfigured_is_empty() {
        let store = PolicyStore::default();
        store.replace(&PolicyDocument::default()).unwrap();

        let resolved = store.resolve(&identity(), &TierHints::default()).unwrap();
        assert!(resolved.is_empty());
    }

    #[test]
    fn test_tier_fallback_for_unbound_subscription() {
        let store = PolicyStore::default();
        store.replace(&document()).unwrap();

        let identity = RequestIdentity::new(ApiId::new("other/v1"))
            .with_application(ApplicationId::new("app-2"))
            .with_subscription(SubscriptionId::new("sub-2"));
        let tiers = TierHints {
            application: Some("Unlimited".to_string()),
            subscription: Some("15PerMin".to_string()),
        };

        let resolved = store.resolve(&identity, &tiers).unwrap();
        assert_eq!(names(&resolved), vec!["15PerMin"]);
    }

    #[test]
    fn test_unknown_tier_fails_closed() {
        let store = PolicyStore::default();
        store.replace(&document()).unwrap();

        let identity = RequestIdentity::new(ApiId::new("other/v1"))
            .with_application(ApplicationId::new("app-2"));
        let tiers = TierHints {
            application: Some("Gold".to_string()),
            subscription: None,
        };

        let err = store.resolve(&identity, &tiers).unwrap_err();
        assert!(matches!(err, AppError::PolicyStoreUnavailable(_)));
    }

    #[test]
    fn test_build_rejects_undefined_binding() {
        let mut doc = document();
        doc.bindings
            .api
            .insert("petstore/v2".to_string(), vec!["Missing".to_string()]);

        let err = PolicySnapshot::build(&doc).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_failed_replace_keeps_previous_snapshot() {
        let store = PolicyStore::default();
        store.replace(&document()).unwrap();

        let mut bad = document();
        bad.version = 8;
        bad.policies.insert(
            "Broken".to_string(),
            PolicySpec {
                request_count: 1,
                window_secs: 0,
                scope: PolicyScope::Api,
            },
        );

        assert!(store.replace(&bad).is_err());
        assert_eq!(store.snapshot().unwrap().version(), 7);
    }

    #[test]
    fn test_readers_keep_their_snapshot_across_swap() {
        let store = PolicyStore::default();
        store.replace(&document()).unwrap();
        let held = store.snapshot().unwrap();

        store.replace(&PolicyDocument::default()).unwrap();

        assert_eq!(held.version(), 7);
        assert!(held.policy("15PerMin").is_some());
        assert!(store.snapshot().unwrap().is_empty());
    }
}
