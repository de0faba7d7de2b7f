//! 令牌校验
//!
//! 只做认证，不做授权。检查顺序：
//! 格式 → 算法白名单 → 过期 → 生效时间 → 签发方与签名 → API 绑定

use crate::claims::{ClaimSet, Claims};
use crate::trust::TrustStore;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, Validation, decode};
use serde::Deserialize;
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use tollgate_common::ApiId;
use tollgate_domain::RejectionReason;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct RawHeader {
    alg: String,
}

/// 令牌校验器
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    trust: Arc<TrustStore>,
    leeway_secs: i64,
}

impl TokenVerifier {
    pub fn new(trust: Arc<TrustStore>) -> Self {
        Self {
            trust,
            leeway_secs: 0,
        }
    }

    /// 允许的时钟偏差（秒）
    pub fn with_leeway(mut self, leeway_secs: u64) -> Self {
        self.leeway_secs = i64::try_from(leeway_secs).unwrap_or(i64::MAX);
        self
    }

    /// 校验令牌并确认其绑定到 `api`
    pub fn verify(&self, token: &str, api: &ApiId, now: i64) -> Result<ClaimSet, RejectionReason> {
        let (header, claims) = Self::split(token)?;

        let algorithm = Algorithm::from_str(&header.alg).map_err(|_| {
            debug!(alg = %header.alg, "Rejecting token with unsupported algorithm");
            RejectionReason::InvalidSignature
        })?;
        if !self.trust.is_allowed(algorithm) {
            debug!(alg = ?algorithm, "Rejecting token with algorithm outside allow-list");
            return Err(RejectionReason::InvalidSignature);
        }

        if now > claims.exp.saturating_add(self.leeway_secs) {
            return Err(RejectionReason::Expired);
        }
        let not_before = claims.nbf.into_iter().chain(claims.iat).max();
        if not_before.is_some_and(|t| t > now.saturating_add(self.leeway_secs)) {
            return Err(RejectionReason::NotYetValid);
        }

        let issuer = self.trust.issuer(&claims.iss).ok_or_else(|| {
            debug!(iss = %claims.iss, "Rejecting token from unknown issuer");
            RejectionReason::InvalidSignature
        })?;
        // 签发方绑定的算法必须与 header 一致，防止算法混淆
        if issuer.algorithm != algorithm {
            return Err(RejectionReason::InvalidSignature);
        }

        let verified = decode::<Claims>(token, &issuer.key, &Self::validation(algorithm))
            .map_err(|e| match e.kind() {
                ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) | ErrorKind::InvalidToken => {
                    RejectionReason::Malformed
                }
                _ => RejectionReason::InvalidSignature,
            })?
            .claims;

        if verified.subscription_for(api).is_none() && !verified.aud.contains(api) {
            debug!(api = %api, sub = %verified.sub, "Token is not bound to the requested API");
            return Err(RejectionReason::ScopeMismatch);
        }

        Ok(ClaimSet::from_verified(verified, api))
    }

    /// 解析 header 与 claims，不校验签名
    fn split(token: &str) -> Result<(RawHeader, Claims), RejectionReason> {
        let mut parts = token.split('.');
        let (Some(header), Some(payload), Some(_signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(RejectionReason::Malformed);
        };
        if header.is_empty() || payload.is_empty() {
            return Err(RejectionReason::Malformed);
        }

        let header: RawHeader = Self::decode_segment(header)?;
        let claims: Claims = Self::decode_segment(payload)?;
        Ok((header, claims))
    }

    fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str) -> Result<T, RejectionReason> {
        let bytes = URL_SAFE_NO_PAD
            .decode(segment)
            .map_err(|_| RejectionReason::Malformed)?;
        serde_json::from_slice(&bytes).map_err(|_| RejectionReason::Malformed)
    }

    /// 时间与 API 绑定由 `verify` 自行检查，这里只验签
    fn validation(algorithm: Algorithm) -> Validation {
        let mut validation = Validation::new(algorithm);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();
        validation.leeway = 0;
        validation
    }
}
