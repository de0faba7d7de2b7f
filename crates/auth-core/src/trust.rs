//! 信任集：签发方 → 验签密钥

use jsonwebtoken::{Algorithm, DecodingKey};
use std::collections::HashMap;
use std::str::FromStr;
use tollgate_errors::{AppError, AppResult};

/// 默认允许的签名算法
pub const DEFAULT_ALGORITHMS: &[Algorithm] = &[
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::ES256,
    Algorithm::HS256,
];

/// 单个受信签发方
#[derive(Clone)]
pub struct TrustedIssuer {
    pub issuer: String,
    pub algorithm: Algorithm,
    pub(crate) key: DecodingKey,
}

impl std::fmt::Debug for TrustedIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustedIssuer")
            .field("issuer", &self.issuer)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// 信任集
#[derive(Debug, Clone)]
pub struct TrustStore {
    issuers: HashMap<String, TrustedIssuer>,
    allowed: Vec<Algorithm>,
}

impl TrustStore {
    pub fn new(allowed: Vec<Algorithm>) -> Self {
        Self {
            issuers: HashMap::new(),
            allowed,
        }
    }

    /// 按名称解析算法白名单，`none` 等未知算法直接报错
    pub fn with_algorithm_names<S: AsRef<str>>(names: &[S]) -> AppResult<Self> {
        let allowed = names
            .iter()
            .map(|n| parse_algorithm(n.as_ref()))
            .collect::<AppResult<Vec<_>>>()?;
        Ok(Self::new(allowed))
    }

    /// 添加 HMAC 签发方
    pub fn add_hmac(&mut self, issuer: impl Into<String>, algorithm: Algorithm, secret: &[u8]) -> AppResult<()> {
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(AppError::configuration(format!(
                "{:?} is not an HMAC algorithm",
                algorithm
            )));
        }
        if secret.len() < 32 {
            return Err(AppError::configuration(
                "HMAC secret must be at least 32 bytes long",
            ));
        }
        self.insert(issuer.into(), algorithm, DecodingKey::from_secret(secret))
    }

    /// 添加 PEM 公钥签发方（RSA / RSA-PSS / EC）
    pub fn add_public_key_pem(&mut self, issuer: impl Into<String>, algorithm: Algorithm, pem: &[u8]) -> AppResult<()> {
        let key = match algorithm {
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => DecodingKey::from_rsa_pem(pem),
            Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(pem),
            Algorithm::EdDSA => DecodingKey::from_ed_pem(pem),
            other => {
                return Err(AppError::configuration(format!(
                    "{:?} does not use a public key",
                    other
                )));
            }
        }
        .map_err(|e| AppError::configuration(format!("Invalid public key: {}", e)))?;

        self.insert(issuer.into(), algorithm, key)
    }

    fn insert(&mut self, issuer: String, algorithm: Algorithm, key: DecodingKey) -> AppResult<()> {
        if !self.allowed.contains(&algorithm) {
            return Err(AppError::configuration(format!(
                "Issuer {} uses {:?}, which is not in the allowed algorithms",
                issuer, algorithm
            )));
        }
        self.issuers.insert(
            issuer.clone(),
            TrustedIssuer {
                issuer,
                algorithm,
                key,
            },
        );
        Ok(())
    }

    pub fn issuer(&self, iss: &str) -> Option<&TrustedIssuer> {
        self.issuers.get(iss)
    }

    pub fn is_allowed(&self, algorithm: Algorithm) -> bool {
        self.allowed.contains(&algorithm)
    }

    pub fn len(&self) -> usize {
        self.issuers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issuers.is_empty()
    }
}

impl Default for TrustStore {
    fn default() -> Self {
        Self::new(DEFAULT_ALGORITHMS.to_vec())
    }
}

/// 解析算法名称
pub fn parse_algorithm(name: &str) -> AppResult<Algorithm> {
    Algorithm::from_str(name)
        .map_err(|_| AppError::configuration(format!("Unsupported signing algorithm: {}", name)))
}
