//! 测试装配

use crate::admission::AdmissionCoordinator;
use crate::routing::{Route, RouteTable, router};
use crate::state::AppState;
use axum::{Router, response::Response};
use std::collections::BTreeMap;
use std::sync::Arc;
use tollgate_auth_core::{Algorithm, Claims, TokenSigner, TokenVerifier, TrustStore};
use tollgate_common::{Clock, ManualClock};
use tollgate_domain::{CounterFailureMode, PolicyBindings, PolicyDocument, PolicyScope, PolicySpec};
use tollgate_ports::CounterStore;
use tollgate_quota::{LocalCounterStore, PolicyStore, QuotaEnforcer};

pub const ISSUER: &str = "https://localhost:9443/oauth2/token";
pub const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";
pub const NOW: i64 = 1_700_000_000;

pub fn policy_document() -> PolicyDocument {
    let spec = |request_count, scope| PolicySpec {
        request_count,
        window_secs: 60,
        scope,
    };

    let mut policies = BTreeMap::new();
    policies.insert("100PerMin".to_string(), spec(100, PolicyScope::Api));
    policies.insert("2PerMin".to_string(), spec(2, PolicyScope::Api));
    policies.insert("15PerMin".to_string(), spec(15, PolicyScope::Subscription));
    policies.insert("Gold".to_string(), spec(5000, PolicyScope::Application));
    policies.insert("Blocked".to_string(), spec(0, PolicyScope::Api));

    let mut bindings = PolicyBindings::default();
    bindings
        .api
        .insert("petstore/v1".to_string(), vec!["100PerMin".to_string()]);
    bindings
        .api
        .insert("public".to_string(), vec!["2PerMin".to_string()]);

    PolicyDocument {
        version: 1,
        policies,
        bindings,
    }
}

/// 订阅了 petstore/v1（15PerMin）的令牌
pub fn petstore_claims() -> Claims {
    Claims::new("admin", ISSUER, NOW + 3600)
        .issued_at(NOW - 5)
        .with_application("42", Some("Unlimited"))
        .with_subscription("/petstore/v1", Some("sub-7"), Some("15PerMin"))
}

pub struct TestGateway {
    state: AppState,
    signer: TokenSigner,
}

impl TestGateway {
    pub fn new() -> Self {
        Self::build(
            Some(policy_document()),
            Arc::new(LocalCounterStore::new()),
            CounterFailureMode::Closed,
            Arc::new(ManualClock::new(NOW)),
        )
    }

    /// 未加载任何策略
    pub fn empty() -> Self {
        Self::build(
            None,
            Arc::new(LocalCounterStore::new()),
            CounterFailureMode::Closed,
            Arc::new(ManualClock::new(NOW)),
        )
    }

    pub fn with_clock(clock: Arc<ManualClock>) -> Self {
        Self::build(
            Some(policy_document()),
            Arc::new(LocalCounterStore::new()),
            CounterFailureMode::Closed,
            clock,
        )
    }

    pub fn with_document(doc: PolicyDocument) -> Self {
        Self::build(
            Some(doc),
            Arc::new(LocalCounterStore::new()),
            CounterFailureMode::Closed,
            Arc::new(ManualClock::new(NOW)),
        )
    }

    pub fn with_counter_store(store: Arc<dyn CounterStore>, mode: CounterFailureMode) -> Self {
        Self::build(Some(policy_document()), store, mode, Arc::new(ManualClock::new(NOW)))
    }

    fn build(
        doc: Option<PolicyDocument>,
        counters: Arc<dyn CounterStore>,
        mode: CounterFailureMode,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut trust = TrustStore::default();
        trust.add_hmac(ISSUER, Algorithm::HS256, SECRET).unwrap();

        let policies = Arc::new(PolicyStore::default());
        if let Some(doc) = doc {
            policies.replace(&doc).unwrap();
        }

        let coordinator = AdmissionCoordinator::new(
            TokenVerifier::new(Arc::new(trust)),
            policies.clone(),
            QuotaEnforcer::new(counters, mode),
            clock,
        );

        let routes = RouteTable::new(vec![
            Route::new("/petstore/v1", true),
            Route::new("/public", false),
        ]);

        Self {
            state: AppState {
                routes: Arc::new(routes),
                coordinator: Arc::new(coordinator),
                policies,
                redis: None,
                metrics: None,
            },
            signer: TokenSigner::hmac(Algorithm::HS256, SECRET),
        }
    }

    pub fn coordinator(&self) -> &AdmissionCoordinator {
        &self.state.coordinator
    }

    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    pub fn sign(&self, claims: &Claims) -> String {
        self.signer.sign(claims).unwrap()
    }
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
