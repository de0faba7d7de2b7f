//! tollgate-auth-core - 令牌校验
//!
//! JWT 解析、签发方信任集、签名与时间校验、API 绑定

pub mod claims;
pub mod signer;
pub mod trust;
pub mod verifier;

pub use claims::*;
pub use signer::TokenSigner;
pub use trust::{DEFAULT_ALGORITHMS, TrustStore, TrustedIssuer, parse_algorithm};
pub use verifier::TokenVerifier;

pub use jsonwebtoken::Algorithm;
