//! 健康检查

use serde::Serialize;

/// 健康检查状态
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub checks: Vec<HealthCheck>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HealthStatus {
    pub fn new() -> Self {
        Self {
            healthy: true,
            checks: Vec::new(),
        }
    }

    pub fn add_check(&mut self, name: impl Into<String>, healthy: bool, message: Option<String>) {
        if !healthy {
            self.healthy = false;
        }
        self.checks.push(HealthCheck {
            name: name.into(),
            healthy,
            message,
        });
    }
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_failed_check_marks_unhealthy() {
        let mut status = HealthStatus::new();
        status.add_check("policy_store", true, None);
        status.add_check("redis", false, Some("connection refused".to_string()));

        assert!(!status.healthy);
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["checks"][0]["name"], "policy_store");
        assert!(json["checks"][0].get("message").is_none());
        assert_eq!(json["checks"][1]["message"], "connection refused");
    }
}
