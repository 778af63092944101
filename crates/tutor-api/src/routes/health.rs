//! 연결 확인 endpoint.
//!
//! 인증된 클라이언트가 토큰 상태를 확인할 때 사용합니다.

use axum::{response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::error::ApiResponse;

/// Ping 응답 데이터.
#[derive(Debug, Serialize, Deserialize)]
pub struct PingResponse {
    pub message: String,
}

/// GET …/ping
pub async fn ping(AuthUser(_claims): AuthUser) -> impl IntoResponse {
    Json(ApiResponse::success(
        "ok",
        PingResponse {
            message: "pong".to_string(),
        },
    ))
}
