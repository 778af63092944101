//! Prometheus 메트릭 설정 및 유틸리티.
//!
//! 인증 판정과 토큰 발급 결과를 수집하고 `/metrics` 엔드포인트로 노출합니다.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

/// Prometheus 메트릭 레코더를 설정하고 핸들을 반환합니다.
///
/// # Errors
///
/// 레코더가 이미 설치되어 있으면 에러를 반환합니다.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        )?
        .install_recorder()
}

// ============================================================================
// HTTP 메트릭
// ============================================================================

/// HTTP 응답 카운터 증가.
pub fn record_http_response(method: &str, route: &str, status: u16) {
    counter!(
        "http_responses_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// HTTP 요청 지속 시간 기록.
pub fn record_http_duration(method: &str, route: &str, duration_secs: f64) {
    histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "route" => route.to_string()
    )
    .record(duration_secs);
}

// ============================================================================
// 인증 메트릭
// ============================================================================

/// 게이트 판정 카운터 증가.
///
/// `outcome`: exempt, allowed, missing, expired, malformed, denied, unmatched
pub fn record_auth_decision(outcome: &'static str) {
    counter!("auth_decisions_total", "outcome" => outcome).increment(1);
}

/// Access Token 발급 결과 카운터 증가.
///
/// `outcome`: issued, not_found, expired, store_error
pub fn record_refresh_issuance(outcome: &'static str) {
    counter!("refresh_issuance_total", "outcome" => outcome).increment(1);
}

/// 세션 생성/폐기 카운터 증가.
pub fn record_session_event(event: &'static str) {
    counter!("session_events_total", "event" => event).increment(1);
}
