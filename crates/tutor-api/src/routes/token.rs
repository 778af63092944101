//! 토큰 수명 주기 endpoint.
//!
//! - `GET …/generate_access_token`: Refresh Token으로 Access Token 발급 (면제 경로)
//! - `POST …/logout_all_devices`: 호출자의 모든 세션 폐기

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::auth::{AuthError, AuthUser, BearerTokens};
use crate::error::ApiResponse;
use crate::state::AppState;

/// Access Token 발급 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
}

/// 세션 폐기 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutResponse {
    /// 만료 처리된 세션 수
    pub sessions_closed: u64,
}

/// GET …/generate_access_token
///
/// Bearer 값의 `refresh` 구성요소만 사용합니다.
pub async fn generate_access_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<AccessTokenResponse>>, AuthError> {
    let refresh = BearerTokens::from_headers(&headers)
        .refresh
        .ok_or(AuthError::RefreshNotFound)?;

    let access_token = state.sessions.issue_access_token(&refresh).await?;
    Ok(Json(ApiResponse::success(
        "Access token generated",
        AccessTokenResponse { access_token },
    )))
}

/// POST …/logout_all_devices
///
/// 이미 발급된 Access Token은 자연 만료까지 유효합니다.
pub async fn logout_all_devices(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Response {
    match state.sessions.revoke_all(claims.user_id()).await {
        Ok(sessions_closed) => Json(ApiResponse::success(
            "Logged out from all devices",
            LogoutResponse { sessions_closed },
        ))
        .into_response(),
        Err(e) => {
            error!(user_id = claims.user_id(), error = %e, "세션 폐기 실패");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse::<()>::failure("Logout failed", 503_000)),
            )
                .into_response()
        }
    }
}
