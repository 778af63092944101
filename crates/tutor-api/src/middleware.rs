//! HTTP 요청 metrics middleware.

use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};

use crate::metrics::{record_http_duration, record_http_response};

/// HTTP 메트릭을 수집하는 미들웨어 레이어.
///
/// 라벨에는 실제 경로 대신 라우트 템플릿을 사용합니다.
/// - `http_responses_total`: method, route, status
/// - `http_request_duration_seconds`: method, route
pub async fn metrics_layer(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    record_http_response(&method, &route, response.status().as_u16());
    record_http_duration(&method, &route, start.elapsed().as_secs_f64());

    response
}
