//! 令牌签发（工具与测试用）

use crate::claims::Claims;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use tollgate_errors::{AppError, AppResult};

/// 令牌签发器
#[derive(Clone)]
pub struct TokenSigner {
    algorithm: Algorithm,
    key: EncodingKey,
}

impl TokenSigner {
    /// HMAC 签发
    pub fn hmac(algorithm: Algorithm, secret: &[u8]) -> Self {
        Self {
            algorithm,
            key: EncodingKey::from_secret(secret),
        }
    }

    /// RSA 私钥签发（PKCS#1 / PKCS#8 PEM）
    pub fn rsa_pem(algorithm: Algorithm, pem: &[u8]) -> AppResult<Self> {
        let key = EncodingKey::from_rsa_pem(pem)
            .map_err(|e| AppError::configuration(format!("Invalid RSA private key: {}", e)))?;
        Ok(Self { algorithm, key })
    }

    /// 签发令牌
    pub fn sign(&self, claims: &Claims) -> AppResult<String> {
        encode(&Header::new(self.algorithm), claims, &self.key)
            .map_err(|e| AppError::internal(format!("Failed to sign token: {}", e)))
    }
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}
