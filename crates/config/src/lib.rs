//! tollgate-config - 配置加载库

use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use secrecy::Secret;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;
use tollgate_domain::{CounterFailureMode, PolicyScope};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 优雅关闭等待时间
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

fn default_shutdown_grace_secs() -> u64 {
    10
}

/// 遥测配置
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// 生产环境使用 JSON 日志
    #[serde(default)]
    pub json: bool,
    #[serde(default = "default_true")]
    pub metrics: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: false,
            metrics: true,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

/// Redis 配置
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: Secret<String>,
    /// 计数器键前缀
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_key_prefix() -> String {
    "tollgate".to_string()
}

/// 受信签发方
#[derive(Debug, Clone, Deserialize)]
pub struct IssuerConfig {
    pub issuer: String,
    pub algorithm: String,
    /// HS* 共享密钥
    pub secret: Option<Secret<String>>,
    /// 内联 PEM 公钥
    pub public_key_pem: Option<String>,
    /// PEM 公钥文件
    pub public_key_path: Option<PathBuf>,
}

impl IssuerConfig {
    pub fn is_hmac(&self) -> bool {
        self.algorithm.starts_with("HS")
    }
}

/// 令牌信任配置
#[derive(Debug, Clone, Deserialize)]
pub struct TrustConfig {
    #[serde(default = "default_allowed_algorithms")]
    pub allowed_algorithms: Vec<String>,
    /// 时钟偏差容忍（秒）
    #[serde(default)]
    pub leeway_secs: u64,
    #[serde(default)]
    pub issuers: Vec<IssuerConfig>,
}

fn default_allowed_algorithms() -> Vec<String> {
    ["RS256", "RS384", "RS512", "ES256", "HS256"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// 计数器后端
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterBackend {
    /// 进程内计数，多实例之间不共享
    #[default]
    Local,
    /// Redis 共享计数
    Redis,
}

/// 准入配置
#[derive(Debug, Clone, Deserialize)]
pub struct AdmissionConfig {
    #[serde(default = "default_scope_order")]
    pub scope_order: Vec<PolicyScope>,
    #[serde(default)]
    pub counter_backend: CounterBackend,
    #[serde(default)]
    pub counter_failure_mode: CounterFailureMode,
    #[serde(default = "default_unlimited_tiers")]
    pub unlimited_tiers: Vec<String>,
    /// 本地计数器清理间隔
    #[serde(default = "default_eviction_interval_secs")]
    pub eviction_interval_secs: u64,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            scope_order: default_scope_order(),
            counter_backend: CounterBackend::default(),
            counter_failure_mode: CounterFailureMode::default(),
            unlimited_tiers: default_unlimited_tiers(),
            eviction_interval_secs: default_eviction_interval_secs(),
        }
    }
}

fn default_scope_order() -> Vec<PolicyScope> {
    PolicyScope::default_order()
}

fn default_unlimited_tiers() -> Vec<String> {
    vec!["Unlimited".to_string()]
}

fn default_eviction_interval_secs() -> u64 {
    60
}

/// 策略来源
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicySourceKind {
    #[default]
    File,
    Redis,
}

/// 策略配置
#[derive(Debug, Clone, Deserialize)]
pub struct PoliciesConfig {
    #[serde(default)]
    pub source: PolicySourceKind,
    /// 文件来源：TOML 或 JSON 路径
    pub path: Option<PathBuf>,
    /// Redis 来源：保存 JSON 文档的键
    pub key: Option<String>,
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,
}

fn default_refresh_secs() -> u64 {
    30
}

/// 路由表条目
#[derive(Debug, Clone, Deserialize)]
pub struct ApiRouteConfig {
    /// API context，例如 `/petstore/v1`
    pub context: String,
    #[serde(default = "default_true")]
    pub requires_auth: bool,
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default = "default_app_env")]
    pub app_env: String,
    pub server: ServerConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    pub redis: Option<RedisConfig>,
    pub trust: TrustConfig,
    #[serde(default)]
    pub admission: AdmissionConfig,
    pub policies: PoliciesConfig,
    #[serde(default)]
    pub apis: Vec<ApiRouteConfig>,
}

fn default_app_name() -> String {
    "tollgate".to_string()
}

fn default_app_env() -> String {
    "development".to_string()
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 优先级：`TOLLGATE_*` 环境变量 > `{APP_ENV}.toml` > `default.toml`
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let figment = Figment::new()
            .merge(Toml::file(format!("{}/default.toml", config_dir)))
            .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
            .merge(Env::prefixed("TOLLGATE_").split("__"));

        Self::from_figment(figment)
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// 交叉校验各配置段
    pub fn validate(&self) -> Result<(), ConfigError> {
        let order = &self.admission.scope_order;
        let unique: HashSet<_> = order.iter().collect();
        if order.len() != PolicyScope::default_order().len() || unique.len() != order.len() {
            return Err(ConfigError::Invalid(
                "admission.scope_order must list api, application and subscription exactly once"
                    .to_string(),
            ));
        }

        let needs_redis = self.admission.counter_backend == CounterBackend::Redis
            || self.policies.source == PolicySourceKind::Redis;
        if needs_redis && self.redis.is_none() {
            return Err(ConfigError::Invalid(
                "redis section is required by the configured counter backend or policy source"
                    .to_string(),
            ));
        }

        match self.policies.source {
            PolicySourceKind::File if self.policies.path.is_none() => {
                return Err(ConfigError::Invalid(
                    "policies.path is required for the file source".to_string(),
                ));
            }
            PolicySourceKind::Redis if self.policies.key.is_none() => {
                return Err(ConfigError::Invalid(
                    "policies.key is required for the redis source".to_string(),
                ));
            }
            _ => {}
        }
        if self.policies.refresh_secs == 0 {
            return Err(ConfigError::Invalid(
                "policies.refresh_secs must be greater than zero".to_string(),
            ));
        }

        for issuer in &self.trust.issuers {
            let has_key = if issuer.is_hmac() {
                issuer.secret.is_some()
            } else {
                issuer.public_key_pem.is_some() || issuer.public_key_path.is_some()
            };
            if !has_key {
                return Err(ConfigError::Invalid(format!(
                    "issuer {} has no key material for {}",
                    issuer.issuer, issuer.algorithm
                )));
            }
        }

        let mut contexts = HashSet::new();
        for api in &self.apis {
            if api.context.trim_matches('/').is_empty() {
                return Err(ConfigError::Invalid("apis.context must not be empty".to_string()));
            }
            if !contexts.insert(api.context.trim_matches('/')) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate api context {}",
                    api.context
                )));
            }
        }

        Ok(())
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }
}

#[cfg(test)]
mod tests;
