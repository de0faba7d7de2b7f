//! 决策 → HTTP 响应
//!
//! 响应体只包含稳定的错误码与通用描述，
//! 策略名、计数值和内部限流头都不会出现在响应里。

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tollgate_domain::{Decision, DenyReason, PolicyScope};
use tollgate_errors::AppError;

/// 错误响应体
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub description: String,
}

impl ErrorBody {
    fn new(code: u32, message: &str, description: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            description: description.to_string(),
        }
    }
}

/// 基础设施错误 → RFC 7807 响应，内部原因不进入响应体
pub fn problem(err: &AppError) -> Response {
    let problem = err.to_problem_details();
    let status = StatusCode::from_u16(problem.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = (status, Json(problem)).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/problem+json"),
    );
    response
}

/// 未匹配任何 API
pub fn not_found(path: &str) -> Response {
    problem(&AppError::not_found(format!("No API matches {}", path)))
}

/// 渲染准入决策
pub fn render(decision: &Decision) -> Response {
    let Some(reason) = decision.reason else {
        return StatusCode::OK.into_response();
    };

    match reason {
        DenyReason::Unauthenticated => {
            let body = match decision.detail {
                Some(_) => ErrorBody::new(
                    900901,
                    "Invalid Credentials",
                    "Make sure you have provided the correct security credentials",
                ),
                None => ErrorBody::new(
                    900902,
                    "Missing Credentials",
                    "Make sure your API invocation call has a header: 'Authorization : Bearer ***'",
                ),
            };
            let mut response = (StatusCode::UNAUTHORIZED, Json(body)).into_response();
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
            response
        }
        DenyReason::Throttled => {
            let code = match decision.matched_scope {
                Some(PolicyScope::Application) => 900803,
                Some(PolicyScope::Subscription) => 900804,
                Some(PolicyScope::Api) | None => 900800,
            };
            let body = ErrorBody::new(code, "Message throttled out", "You have exceeded your quota");
            let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();

            // 向上取整，至少 1 秒
            let secs = decision
                .retry_after
                .map(|d| d.as_secs() + u64::from(d.subsec_nanos() > 0))
                .unwrap_or(1)
                .max(1);
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
            response
        }
        DenyReason::PolicyStoreUnavailable => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorBody::new(
                900810,
                "Service Unavailable",
                "Throttling policies are not available",
            )),
        )
            .into_response(),
        DenyReason::CounterStoreUnavailable => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorBody::new(
                900811,
                "Service Unavailable",
                "Quota counters are not available",
            )),
        )
            .into_response(),
    }
}
