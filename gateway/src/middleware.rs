//! 准入检查入口
//!
//! 外部代理的授权过滤器把原始请求转发到这里，
//! 返回 200 表示放行，其余状态码连同响应体直接回给客户端。

use crate::response::{not_found, render};
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    response::Response,
};
use tracing::debug;

/// 内部调用使用的令牌头
pub const INTERNAL_KEY_HEADER: &str = "internal-key";

/// 提取请求凭证
///
/// 优先 `Authorization: Bearer <jwt>`，其次 `Internal-Key: <jwt>`。
pub fn extract_credential(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| {
            let (scheme, token) = h.split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
        })
        .filter(|t| !t.is_empty());

    bearer.or_else(|| {
        headers
            .get(INTERNAL_KEY_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|t| !t.is_empty())
    })
}

/// 准入检查处理器
pub async fn admission_check(State(state): State<AppState>, request: Request) -> Response {
    let path = request.uri().path();
    let Some(route) = state.routes.find(path) else {
        debug!(path, "No API matches request path");
        return not_found(path);
    };

    let decision = state
        .coordinator
        .handle(route, extract_credential(request.headers()))
        .await;
    render(&decision)
}
