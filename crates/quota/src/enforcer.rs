//! 配额执行器
//!
//! 固定窗口计数，按策略顺序评估：
//! 1. 按策略作用域派生计数键
//! 2. 在计数存储上原子地「过期重置 → 比较 → 递增」
//! 3. 第一条超限的策略终止评估并拒绝
//!
//! 之前已通过的策略的计数不回滚。

use std::sync::Arc;
use std::time::Instant;
use tollgate_domain::{CounterFailureMode, Decision, DenyReason, Policy, PolicyKey, RequestIdentity};
use tollgate_ports::CounterStore;
use tracing::{debug, warn};

/// 配额执行器
#[derive(Clone)]
pub struct QuotaEnforcer {
    store: Arc<dyn CounterStore>,
    failure_mode: CounterFailureMode,
}

impl QuotaEnforcer {
    pub fn new(store: Arc<dyn CounterStore>, failure_mode: CounterFailureMode) -> Self {
        Self { store, failure_mode }
    }

    pub fn failure_mode(&self) -> CounterFailureMode {
        self.failure_mode
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// 对一组有序策略做准入判断
    pub async fn admit(&self, policies: &[Arc<Policy>], identity: &RequestIdentity, now: Instant) -> Decision {
        for policy in policies {
            let Some(key) = PolicyKey::derive(policy, identity) else {
                debug!(policy = %policy.name, scope = %policy.scope, "Policy not applicable to request");
                continue;
            };

            if policy.is_blocking() {
                debug!(key = %key, "Blocking policy matched");
                return Decision::throttled(policy.name.clone(), policy.scope, policy.window);
            }

            match self.store.try_acquire(&key, policy, now).await {
                Ok(acquisition) if acquisition.allowed => {
                    debug!(key = %key, count = acquisition.count, limit = policy.request_count, "Quota acquired");
                }
                Ok(acquisition) => {
                    debug!(key = %key, count = acquisition.count, limit = policy.request_count, "Quota exhausted");
                    return Decision::throttled(policy.name.clone(), policy.scope, acquisition.reset_after);
                }
                Err(e) => match self.failure_mode {
                    CounterFailureMode::Open => {
                        warn!(error = %e, key = %key, "Counter store failed, allowing request (fail-open)");
                    }
                    CounterFailureMode::Closed => {
                        warn!(error = %e, key = %key, "Counter store failed, denying request (fail-closed)");
                        return Decision {
                            matched_policy: Some(policy.name.clone()),
                            matched_scope: Some(policy.scope),
                            ..Decision::deny(DenyReason::CounterStoreUnavailable)
                        };
                    }
                },
            }
        }

        Decision::allow()
    }
}
