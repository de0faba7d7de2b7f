//! ports - 抽象 trait 层
//!
//! 定义计数存储与策略来源的抽象接口

mod counter_store;
mod policy_source;

pub use counter_store::*;
pub use policy_source::*;
