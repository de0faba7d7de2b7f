//! 准入决策上报
//!
//! 每个决策只上报一次：一条日志 + 一次计数。

use tollgate_domain::Decision;
use tracing::{debug, info};

/// 记录一次准入决策
///
/// 策略名只出现在 debug 日志里，不进入指标标签。
pub fn record_decision(api: &str, decision: &Decision) {
    let reason = decision.reason.map(|r| r.as_str()).unwrap_or("none");

    metrics::counter!(
        "tollgate_admission_decisions_total",
        "api" => api.to_string(),
        "outcome" => decision.outcome(),
        "reason" => reason,
    )
    .increment(1);

    if decision.allowed {
        debug!(api, "Request admitted");
        return;
    }

    if decision.is_throttled() {
        debug!(
            api,
            policy = decision.matched_policy.as_deref().unwrap_or_default(),
            scope = ?decision.matched_scope,
            retry_after_secs = decision.retry_after.map(|d| d.as_secs()),
            "Request throttled"
        );
    } else {
        info!(
            api,
            reason,
            detail = decision.detail.map(|d| d.as_str()),
            "Request denied"
        );
    }
}
