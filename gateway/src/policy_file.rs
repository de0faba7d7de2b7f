//! 文件策略来源（TOML / JSON）

use async_trait::async_trait;
use figment::{
    Figment,
    providers::{Format, Json, Toml},
};
use std::path::PathBuf;
use tollgate_domain::PolicyDocument;
use tollgate_errors::{AppError, AppResult};
use tollgate_ports::PolicySource;

/// 从本地文件读取策略文档，按扩展名区分格式
#[derive(Debug, Clone)]
pub struct FilePolicySource {
    path: PathBuf,
}

impl FilePolicySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn is_json(&self) -> bool {
        self.path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
    }
}

#[async_trait]
impl PolicySource for FilePolicySource {
    async fn fetch(&self) -> AppResult<PolicyDocument> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            AppError::not_found(format!("Failed to read {}: {}", self.path.display(), e))
        })?;

        let figment = if self.is_json() {
            Figment::from(Json::string(&raw))
        } else {
            Figment::from(Toml::string(&raw))
        };

        figment
            .extract()
            .map_err(|e| AppError::validation(format!("Invalid policy document: {}", e)))
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_domain::PolicyScope;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tollgate-policy-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn test_toml_document() {
        let path = temp_file(
            "policies.toml",
            r#"
            version = 2

            [policies.15PerMin]
            request_count = 15
            window_secs = 60
            scope = "subscription"

            [bindings.api]
            "petstore/v1" = ["15PerMin"]
            "#,
        );

        let doc = FilePolicySource::new(&path).fetch().await.unwrap();
        assert_eq!(doc.version, 2);
        assert_eq!(doc.policies["15PerMin"].scope, PolicyScope::Subscription);
        assert_eq!(doc.bindings.api["petstore/v1"], vec!["15PerMin".to_string()]);
    }

    #[tokio::test]
    async fn test_json_document() {
        let path = temp_file(
            "policies.json",
            r#"{"version":5,"policies":{"Gold":{"request_count":5000,"window_secs":60,"scope":"application"}}}"#,
        );

        let doc = FilePolicySource::new(&path).fetch().await.unwrap();
        assert_eq!(doc.version, 5);
        assert!(doc.bindings.api.is_empty());
    }

    #[tokio::test]
    async fn test_bundled_policies_bind_api_scoped_policies() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../config/policies.toml");
        let doc = FilePolicySource::new(path).fetch().await.unwrap();

        assert!(!doc.bindings.api.is_empty());
        for names in doc.bindings.api.values() {
            for name in names {
                assert_eq!(doc.policies[name].scope, PolicyScope::Api, "{name}");
            }
        }
        assert!(tollgate_quota::PolicySnapshot::build(&doc).is_ok());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let source = FilePolicySource::new("/nonexistent/tollgate/policies.toml");
        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_invalid_document() {
        let path = temp_file("broken.toml", "[policies.X]\nrequest_count = \"many\"\n");
        let err = FilePolicySource::new(&path).fetch().await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
