//! 인증/인가 에러와 HTTP 응답 변환.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::jwt::TokenError;
use crate::error::ApiResponse;

/// 인증 게이트와 토큰 발급에서 발생하는 에러.
///
/// 모든 실패는 닫힌 쪽(거부)으로 처리됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Token missing")]
    TokenMissing,
    #[error("Token has expired")]
    TokenExpired,
    #[error("Invalid token")]
    TokenMalformed,
    /// 존재하지 않는 Refresh Token (저장소 장애 포함)
    #[error("Refresh token not found")]
    RefreshNotFound,
    /// 만료 또는 폐기된 Refresh Token
    #[error("Refresh token has expired")]
    RefreshExpired,
    /// 정책 항목은 있으나 역할 부족
    #[error("Access denied")]
    PolicyDenied,
    /// 경로를 다루는 정책 항목 없음
    #[error("Access denied")]
    PathUnmatched,
}

impl AuthError {
    /// 응답 본문의 `status_code`.
    pub fn status_code(&self) -> u32 {
        match self {
            AuthError::TokenMissing => 401_000,
            AuthError::TokenExpired => 401_001,
            AuthError::TokenMalformed => 401_002,
            AuthError::RefreshNotFound => 401_003,
            AuthError::RefreshExpired => 401_004,
            AuthError::PolicyDenied => 403_000,
            AuthError::PathUnmatched => 403_001,
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            AuthError::PolicyDenied | AuthError::PathUnmatched => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// 메트릭 라벨.
    pub fn outcome(&self) -> &'static str {
        match self {
            AuthError::TokenMissing => "missing",
            AuthError::TokenExpired => "expired",
            AuthError::TokenMalformed => "malformed",
            AuthError::RefreshNotFound => "refresh_not_found",
            AuthError::RefreshExpired => "refresh_expired",
            AuthError::PolicyDenied => "denied",
            AuthError::PathUnmatched => "unmatched",
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Missing => AuthError::TokenMissing,
            TokenError::Expired => AuthError::TokenExpired,
            TokenError::Malformed => AuthError::TokenMalformed,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()>::failure(self.to_string(), self.status_code());
        (self.http_status(), Json(body)).into_response()
    }
}
