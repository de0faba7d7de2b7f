//! tollgate-domain - 准入路径的领域类型
//!
//! 限流策略、计数键、准入决策与认证拒绝原因

pub mod decision;
pub mod document;
pub mod policy;
pub mod rejection;

pub use decision::*;
pub use document::*;
pub use policy::*;
pub use rejection::*;
