use crate::{AppConfig, CounterBackend, ConfigError, PolicySourceKind, RedisConfig};
use figment::Jail;
use secrecy::{ExposeSecret, Secret};
use tollgate_domain::{CounterFailureMode, PolicyScope};

const BASE: &str = r#"
[server]
host = "0.0.0.0"
port = 8080

[trust]
[[trust.issuers]]
issuer = "https://localhost:9443/oauth2/token"
algorithm = "HS256"
secret = "0123456789abcdef0123456789abcdef"

[policies]
path = "config/policies.toml"

[[apis]]
context = "/petstore/v1"

[[apis]]
context = "/health-probe"
requires_auth = false
"#;

#[test]
fn test_secret_redaction() {
    let secret = Secret::new("my_secret_password".to_string());
    let debug_output = format!("{:?}", secret);
    assert!(debug_output.contains("Secret([REDACTED"));
    assert!(!debug_output.contains("my_secret_password"));
}

#[test]
fn test_config_struct_redaction() {
    let config = RedisConfig {
        url: Secret::new("redis://:hunter2@localhost:6379".to_string()),
        key_prefix: "tollgate".to_string(),
    };
    let debug_output = format!("{:?}", config);
    assert!(!debug_output.contains("hunter2"));
    assert!(debug_output.contains("Secret([REDACTED"));
}

#[test]
fn test_load_defaults() {
    Jail::expect_with(|jail| {
        jail.create_file("default.toml", BASE)?;

        let config = AppConfig::load(".").map_err(|e| e.to_string())?;
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(
            config.admission.scope_order,
            vec![PolicyScope::Subscription, PolicyScope::Api, PolicyScope::Application]
        );
        assert_eq!(config.admission.counter_backend, CounterBackend::Local);
        assert_eq!(config.admission.counter_failure_mode, CounterFailureMode::Closed);
        assert_eq!(config.admission.unlimited_tiers, vec!["Unlimited".to_string()]);
        assert_eq!(config.policies.source, PolicySourceKind::File);
        assert_eq!(config.policies.refresh_secs, 30);
        assert!(config.apis[0].requires_auth);
        assert!(!config.apis[1].requires_auth);
        assert!(!config.is_production());
        assert_eq!(
            config.trust.issuers[0].secret.as_ref().unwrap().expose_secret(),
            "0123456789abcdef0123456789abcdef"
        );
        Ok(())
    });
}

#[test]
fn test_env_overrides_file() {
    Jail::expect_with(|jail| {
        jail.create_file("default.toml", BASE)?;
        jail.create_file(
            "production.toml",
            r#"
            [telemetry]
            json = true
            "#,
        )?;
        jail.set_env("APP_ENV", "production");
        jail.set_env("TOLLGATE_APP_ENV", "production");
        jail.set_env("TOLLGATE_SERVER__PORT", "9090");
        jail.set_env("TOLLGATE_ADMISSION__COUNTER_FAILURE_MODE", "open");

        let config = AppConfig::load(".").map_err(|e| e.to_string())?;
        assert_eq!(config.server.port, 9090);
        assert!(config.telemetry.json);
        assert!(config.is_production());
        assert_eq!(config.admission.counter_failure_mode, CounterFailureMode::Open);
        Ok(())
    });
}

#[test]
fn test_custom_scope_order() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "default.toml",
            &format!(
                "{}\n[admission]\nscope_order = [\"api\", \"application\", \"subscription\"]\n",
                BASE
            ),
        )?;

        let config = AppConfig::load(".").map_err(|e| e.to_string())?;
        assert_eq!(
            config.admission.scope_order,
            vec![PolicyScope::Api, PolicyScope::Application, PolicyScope::Subscription]
        );
        Ok(())
    });
}

#[test]
fn test_duplicate_scope_order_rejected() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "default.toml",
            &format!("{}\n[admission]\nscope_order = [\"api\", \"api\", \"subscription\"]\n", BASE),
        )?;

        let err = AppConfig::load(".").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        Ok(())
    });
}

#[test]
fn test_redis_backend_requires_redis_section() {
    Jail::expect_with(|jail| {
        jail.create_file("default.toml", BASE)?;
        jail.set_env("TOLLGATE_ADMISSION__COUNTER_BACKEND", "redis");

        let err = AppConfig::load(".").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("redis")));
        Ok(())
    });
}

#[test]
fn test_issuer_without_key_rejected() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "default.toml",
            &format!(
                "{}\n[[trust.issuers]]\nissuer = \"https://idp\"\nalgorithm = \"RS256\"\n",
                BASE
            ),
        )?;

        let err = AppConfig::load(".").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("https://idp")));
        Ok(())
    });
}

#[test]
fn test_duplicate_api_context_rejected() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "default.toml",
            &format!("{}\n[[apis]]\ncontext = \"petstore/v1/\"\n", BASE),
        )?;

        assert!(AppConfig::load(".").is_err());
        Ok(())
    });
}

#[test]
fn test_missing_required_section() {
    Jail::expect_with(|jail| {
        jail.create_file("default.toml", "[server]\nhost = \"0.0.0.0\"\nport = 1\n")?;

        let err = AppConfig::load(".").unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
        Ok(())
    });
}
