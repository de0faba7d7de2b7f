//! Tollgate API Gateway
//!
//! 准入检查服务：令牌校验 + 多级限流

mod admission;
mod config;
mod middleware;
mod policy_file;
mod response;
mod routing;
mod state;

#[cfg(test)]
mod test_support;

use std::net::SocketAddr;
use std::time::Duration;
use tollgate_bootstrap::{RuntimeConfig, init_runtime, shutdown_signal};
use tollgate_config::AppConfig;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // 加载配置
    let runtime = RuntimeConfig::default();
    let app_config = AppConfig::load(&runtime.config_dir)?;

    // 初始化 tracing / metrics
    let metrics = init_runtime(&app_config)?;

    let (state, tasks) = config::build_state(&app_config, metrics).await?;
    let app = routing::router(state);

    // 启动服务器
    let addr: SocketAddr = format!("{}:{}", app_config.server.host, app_config.server.port).parse()?;
    info!(%addr, "Starting gateway");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tasks
        .shutdown(Duration::from_secs(app_config.server.shutdown_grace_secs))
        .await;
    info!("Gateway stopped");

    Ok(())
}
