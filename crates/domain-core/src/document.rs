//! 控制面下发的策略文档

use crate::policy::{Policy, PolicyScope};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// 策略定义（名称作为 map 的键）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySpec {
    pub request_count: u64,
    pub window_secs: u64,
    pub scope: PolicyScope,
}

/// 策略绑定：标识 → 策略名列表
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyBindings {
    #[serde(default)]
    pub api: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub application: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub subscription: BTreeMap<String, Vec<String>>,
}

/// 一个完整版本的策略配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDocument {
    /// 版本号，仅用于日志
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub policies: BTreeMap<String, PolicySpec>,
    #[serde(default)]
    pub bindings: PolicyBindings,
}

impl PolicyDocument {
    /// 展开为带名称的策略
    pub fn policies(&self) -> impl Iterator<Item = Policy> + '_ {
        self.policies.iter().map(|(name, spec)| {
            Policy::new(
                name.clone(),
                spec.request_count,
                Duration::from_secs(spec.window_secs),
                spec.scope,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_from_json() {
        let doc: PolicyDocument = serde_json::from_str(
            r#"{
                "version": 3,
                "policies": {
                    "15PerMin": {"request_count": 15, "window_secs": 60, "scope": "subscription"},
                    "100PerMin": {"request_count": 100, "window_secs": 60, "scope": "api"}
                },
                "bindings": {
                    "api": {"petstore/v1": ["100PerMin"]}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(doc.version, 3);
        let names: Vec<String> = doc.policies().map(|p| p.name).collect();
        assert_eq!(names, vec!["100PerMin", "15PerMin"]);
        assert_eq!(doc.bindings.api["petstore/v1"], vec!["100PerMin".to_string()]);
        assert!(doc.bindings.subscription.is_empty());
    }
}
