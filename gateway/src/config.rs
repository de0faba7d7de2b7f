//! Gateway 装配
//!
//! 把 `AppConfig` 转换为运行时组件：信任集、路由表、计数存储、策略来源。

use crate::admission::AdmissionCoordinator;
use crate::policy_file::FilePolicySource;
use crate::routing::{Route, RouteTable};
use crate::state::AppState;
use metrics_exporter_prometheus::PrometheusHandle;
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;
use tollgate_adapter_redis::{RedisCounterStore, RedisPolicySource, create_connection_manager};
use tollgate_auth_core::{TokenVerifier, TrustStore, parse_algorithm};
use tollgate_bootstrap::BackgroundTasks;
use tollgate_common::SystemClock;
use tollgate_config::{ApiRouteConfig, AppConfig, CounterBackend, PolicySourceKind, TrustConfig};
use tollgate_errors::{AppError, AppResult};
use tollgate_ports::{CounterStore, PolicySource};
use tollgate_quota::{LocalCounterStore, PolicyRefresher, PolicyStore, QuotaEnforcer};
use tracing::{error, info};

/// 构建签发方信任集
pub fn build_trust_store(config: &TrustConfig) -> AppResult<TrustStore> {
    let mut trust = TrustStore::with_algorithm_names(&config.allowed_algorithms)?;

    for issuer in &config.issuers {
        let algorithm = parse_algorithm(&issuer.algorithm)?;
        if issuer.is_hmac() {
            let secret = issuer.secret.as_ref().ok_or_else(|| {
                AppError::configuration(format!("Issuer {} has no secret", issuer.issuer))
            })?;
            trust.add_hmac(&issuer.issuer, algorithm, secret.expose_secret().as_bytes())?;
        } else {
            let pem = match (&issuer.public_key_pem, &issuer.public_key_path) {
                (Some(pem), _) => pem.clone().into_bytes(),
                (None, Some(path)) => std::fs::read(path).map_err(|e| {
                    AppError::configuration(format!("Failed to read {}: {}", path.display(), e))
                })?,
                (None, None) => {
                    return Err(AppError::configuration(format!(
                        "Issuer {} has no public key",
                        issuer.issuer
                    )));
                }
            };
            trust.add_public_key_pem(&issuer.issuer, algorithm, &pem)?;
        }
        info!(issuer = %issuer.issuer, algorithm = %issuer.algorithm, "Trusted issuer registered");
    }

    Ok(trust)
}

/// 构建路由表
pub fn build_route_table(apis: &[ApiRouteConfig]) -> RouteTable {
    RouteTable::new(
        apis.iter()
            .map(|api| Route::new(&api.context, api.requires_auth))
            .collect(),
    )
}

/// 装配应用状态并启动后台任务
pub async fn build_state(
    config: &AppConfig,
    metrics: Option<PrometheusHandle>,
) -> AppResult<(AppState, BackgroundTasks)> {
    let mut tasks = BackgroundTasks::new();

    let redis = match &config.redis {
        Some(redis) => Some(create_connection_manager(redis.url.expose_secret()).await?),
        None => None,
    };
    let redis_conn = || {
        redis
            .clone()
            .ok_or_else(|| AppError::configuration("Redis is required but not configured"))
    };

    let counters: Arc<dyn CounterStore> = match config.admission.counter_backend {
        CounterBackend::Local => {
            let store = Arc::new(LocalCounterStore::new());
            let every = Duration::from_secs(config.admission.eviction_interval_secs.max(1));
            tasks.push("counter-eviction", store.spawn_eviction(every));
            store
        }
        CounterBackend::Redis => {
            let prefix = config
                .redis
                .as_ref()
                .map(|r| r.key_prefix.clone())
                .unwrap_or_else(|| "tollgate".to_string());
            Arc::new(RedisCounterStore::new(redis_conn()?).with_key_prefix(prefix))
        }
    };

    let source: Arc<dyn PolicySource> = match config.policies.source {
        PolicySourceKind::File => {
            let path = config
                .policies
                .path
                .clone()
                .ok_or_else(|| AppError::configuration("policies.path is not set"))?;
            Arc::new(FilePolicySource::new(path))
        }
        PolicySourceKind::Redis => {
            let key = config
                .policies
                .key
                .clone()
                .ok_or_else(|| AppError::configuration("policies.key is not set"))?;
            Arc::new(RedisPolicySource::new(redis_conn()?, key))
        }
    };

    let policies = Arc::new(PolicyStore::new(
        config.admission.scope_order.clone(),
        config.admission.unlimited_tiers.iter().cloned(),
    ));

    // 首次加载失败不阻止启动，策略存储保持不可用（拒绝所有请求）直到刷新成功
    let refresher = PolicyRefresher::new(source.clone(), policies.clone());
    if let Err(e) = refresher.refresh_once().await {
        error!(error = %e, source = %source.describe(), "Initial policy load failed");
    }
    tasks.push(
        "policy-refresh",
        refresher.spawn(Duration::from_secs(config.policies.refresh_secs)),
    );

    let trust = build_trust_store(&config.trust)?;
    let verifier = TokenVerifier::new(Arc::new(trust)).with_leeway(config.trust.leeway_secs);
    let enforcer = QuotaEnforcer::new(counters, config.admission.counter_failure_mode);

    info!(
        backend = enforcer.backend(),
        failure_mode = %enforcer.failure_mode(),
        policy_source = %source.describe(),
        routes = config.apis.len(),
        "Admission path assembled"
    );

    let coordinator = AdmissionCoordinator::new(verifier, policies.clone(), enforcer, Arc::new(SystemClock));

    let state = AppState {
        routes: Arc::new(build_route_table(&config.apis)),
        coordinator: Arc::new(coordinator),
        policies,
        redis,
        metrics,
    };

    Ok((state, tasks))
}
