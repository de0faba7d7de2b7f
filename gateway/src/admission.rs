//! 准入协调
//!
//! 校验令牌 → 查询策略 → 执行配额 → 决策。
//! 所有失败都在这里收敛为 `Decision`，每个请求只上报一次。

use crate::routing::Route;
use std::sync::Arc;
use tollgate_auth_core::TokenVerifier;
use tollgate_common::Clock;
use tollgate_domain::{Decision, DenyReason, RequestIdentity};
use tollgate_quota::{PolicyStore, QuotaEnforcer, TierHints};
use tollgate_telemetry::record_decision;
use tracing::{debug, warn};

/// 准入协调器
pub struct AdmissionCoordinator {
    verifier: TokenVerifier,
    policies: Arc<PolicyStore>,
    enforcer: QuotaEnforcer,
    clock: Arc<dyn Clock>,
}

impl AdmissionCoordinator {
    pub fn new(
        verifier: TokenVerifier,
        policies: Arc<PolicyStore>,
        enforcer: QuotaEnforcer,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            verifier,
            policies,
            enforcer,
            clock,
        }
    }

    /// 处理一个请求
    ///
    /// `credential` 为请求头中提取的原始令牌。
    pub async fn handle(&self, route: &Route, credential: Option<&str>) -> Decision {
        let decision = self.decide(route, credential).await;
        record_decision(route.api.as_str(), &decision);
        decision
    }

    async fn decide(&self, route: &Route, credential: Option<&str>) -> Decision {
        let mut identity = RequestIdentity::new(route.api.clone());
        let mut tiers = TierHints::default();

        // 无需认证的 API 忽略令牌，只受 API 级策略约束
        if route.requires_auth {
            let Some(token) = credential else {
                debug!(api = %route.api, "Missing credential");
                return Decision::unauthenticated();
            };

            match self.verifier.verify(token, &route.api, self.clock.unix_timestamp()) {
                Ok(claims) => {
                    debug!(
                        api = %route.api,
                        sub = claims.subject(),
                        iss = claims.issuer(),
                        tier = ?claims.tier(),
                        exp = claims.expires_at(),
                        iat = ?claims.issued_at(),
                        scopes = claims.scopes().len(),
                        "Token verified"
                    );
                    identity.application = claims.application_id().cloned();
                    identity.subscription = claims.subscription_id().cloned();
                    tiers = TierHints {
                        application: claims.application_tier().map(str::to_string),
                        subscription: claims.subscription_tier().map(str::to_string),
                    };
                }
                Err(reason) => return Decision::rejected(reason),
            }
        }

        let policies = match self.policies.resolve(&identity, &tiers) {
            Ok(policies) => policies,
            Err(e) => {
                warn!(error = %e, api = %route.api, "Policy lookup failed, denying request");
                return Decision::deny(DenyReason::PolicyStoreUnavailable);
            }
        };

        self.enforcer.admit(&policies, &identity, self.clock.now()).await
    }
}
