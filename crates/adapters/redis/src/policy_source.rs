//! Redis 策略来源
//!
//! 控制面把整份策略文档以 JSON 写入一个键。

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tollgate_domain::PolicyDocument;
use tollgate_errors::{AppError, AppResult};
use tollgate_ports::PolicySource;

/// Redis 策略来源
#[derive(Clone)]
pub struct RedisPolicySource {
    conn: ConnectionManager,
    key: String,
}

impl RedisPolicySource {
    pub fn new(conn: ConnectionManager, key: impl Into<String>) -> Self {
        Self {
            conn,
            key: key.into(),
        }
    }
}

fn parse_document(key: &str, raw: Option<String>) -> AppResult<PolicyDocument> {
    let raw = raw.ok_or_else(|| AppError::not_found(format!("Policy document key {} is missing", key)))?;
    Ok(serde_json::from_str(&raw)?)
}

#[async_trait]
impl PolicySource for RedisPolicySource {
    async fn fetch(&self) -> AppResult<PolicyDocument> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .get(&self.key)
            .await
            .map_err(|e| AppError::external_service(format!("Failed to read policy document: {}", e)))?;

        parse_document(&self.key, raw)
    }

    fn describe(&self) -> String {
        format!("redis:{}", self.key)
    }
}
