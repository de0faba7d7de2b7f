//! tollgate-bootstrap - 启动骨架
//!
//! 运行时初始化、后台任务与关闭信号

mod runtime;
mod shutdown;

pub use runtime::*;
pub use shutdown::*;
