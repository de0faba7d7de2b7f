//! 路由
//!
//! - `RouteTable`：请求路径 → API（最长前缀，按路径段匹配）
//! - `/health`、`/ready`、`/metrics` 之外的所有路径都是准入检查

use crate::middleware::admission_check;
use crate::state::AppState;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use tollgate_common::ApiId;
use tollgate_telemetry::HealthStatus;
use tower_http::trace::TraceLayer;

/// 路由表条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub api: ApiId,
    /// 是否要求携带令牌
    pub requires_auth: bool,
}

impl Route {
    pub fn new(context: &str, requires_auth: bool) -> Self {
        Self {
            api: ApiId::new(context),
            requires_auth,
        }
    }

    fn segments(&self) -> usize {
        self.api.as_str().split('/').count()
    }

    fn matches(&self, path: &str) -> bool {
        let context = self.api.as_str();
        match path.strip_prefix(context) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

/// API 路由表
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    /// 按路径段数降序，保证最长前缀优先
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(mut routes: Vec<Route>) -> Self {
        routes.sort_by_key(|r| std::cmp::Reverse(r.segments()));
        Self { routes }
    }

    /// 匹配请求路径
    pub fn find(&self, path: &str) -> Option<&Route> {
        let path = path.trim_start_matches('/');
        self.routes.iter().find(|r| r.matches(path))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics))
        .fallback(admission_check)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn readiness_check(State(state): State<AppState>) -> Response {
    let mut status = HealthStatus::new();

    match state.policies.snapshot() {
        Some(snapshot) => status.add_check(
            "policy_store",
            true,
            Some(format!("version {}", snapshot.version())),
        ),
        None => status.add_check(
            "policy_store",
            false,
            Some("no policy snapshot loaded".to_string()),
        ),
    }

    if let Some(conn) = &state.redis {
        let mut conn = conn.clone();
        match tollgate_adapter_redis::check_connection(&mut conn).await {
            Ok(()) => status.add_check("redis", true, None),
            Err(_) => status.add_check("redis", false, Some("unreachable".to_string())),
        }
    }

    let code = if status.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status)).into_response()
}

async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
