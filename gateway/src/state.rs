//! 应用状态

use crate::admission::AdmissionCoordinator;
use crate::routing::RouteTable;
use metrics_exporter_prometheus::PrometheusHandle;
use redis::aio::ConnectionManager;
use std::sync::Arc;
use tollgate_quota::PolicyStore;

#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub coordinator: Arc<AdmissionCoordinator>,
    pub policies: Arc<PolicyStore>,
    /// 配置了 Redis 时用于就绪检查
    pub redis: Option<ConnectionManager>,
    pub metrics: Option<PrometheusHandle>,
}
