//! Redis 计数存储
//!
//! 固定窗口计数，窗口由键过期时间表示。比较与递增在同一个 Lua 脚本中完成，
//! 已到上限时不递增。

use async_trait::async_trait;
use redis::Script;
use redis::aio::ConnectionManager;
use std::time::{Duration, Instant};
use tollgate_domain::{Policy, PolicyKey};
use tollgate_errors::{AppError, AppResult};
use tollgate_ports::{Acquisition, CounterStore};
use tracing::debug;

const ACQUIRE_SCRIPT: &str = r#"
local key = KEYS[1]
local limit = tonumber(ARGV[1])
local window_ms = tonumber(ARGV[2])

local current = tonumber(redis.call('GET', key) or '0')
if current >= limit then
    local ttl = redis.call('PTTL', key)
    if ttl < 0 then
        ttl = window_ms
    end
    return {0, current, ttl}
end

current = redis.call('INCR', key)
if current == 1 then
    redis.call('PEXPIRE', key, window_ms)
end

local ttl = redis.call('PTTL', key)
if ttl < 0 then
    redis.call('PEXPIRE', key, window_ms)
    ttl = window_ms
end

return {1, current, ttl}
"#;

/// Redis 计数存储
///
/// 窗口起点以 Redis 服务端时间为准，`now` 参数不参与计算。
#[derive(Clone)]
pub struct RedisCounterStore {
    conn: ConnectionManager,
    key_prefix: String,
    script: Script,
}

impl RedisCounterStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            key_prefix: "tollgate".to_string(),
            script: Script::new(ACQUIRE_SCRIPT),
        }
    }

    /// 设置键前缀
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    fn counter_key(&self, key: &PolicyKey) -> String {
        format!("{}:counter:{}", self.key_prefix, key)
    }
}

/// 解析脚本返回值 `{allowed, count, pttl}`
fn parse_reply(reply: &[i64]) -> AppResult<Acquisition> {
    let [allowed, count, ttl_ms] = reply else {
        return Err(AppError::counter_store_unavailable(format!(
            "Unexpected script reply of length {}",
            reply.len()
        )));
    };

    Ok(Acquisition {
        allowed: *allowed == 1,
        count: (*count).max(0) as u64,
        reset_after: Duration::from_millis((*ttl_ms).max(0) as u64),
    })
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn try_acquire(
        &self,
        key: &PolicyKey,
        policy: &Policy,
        _now: Instant,
    ) -> AppResult<Acquisition> {
        let redis_key = self.counter_key(key);
        let window_ms = policy.window.as_millis().max(1) as u64;
        let mut conn = self.conn.clone();

        let reply: Vec<i64> = self
            .script
            .key(&redis_key)
            .arg(policy.request_count)
            .arg(window_ms)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| AppError::counter_store_unavailable(format!("Counter script failed: {}", e)))?;

        let acquisition = parse_reply(&reply)?;
        debug!(
            key = %redis_key,
            allowed = acquisition.allowed,
            count = acquisition.count,
            "Redis counter acquire"
        );
        Ok(acquisition)
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
