//! Axum용 인가 미들웨어와 추출기.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tutor_core::AccessClaims;

use super::error::AuthError;
use super::gate::{Admission, AuthGate};

/// 모든 요청에 게이트 판정을 적용하는 미들웨어.
///
/// 허용된 요청에는 검증된 클레임을 extensions에 첨부합니다.
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/{version}/{env}/{surface}/ping", get(ping))
///     .layer(middleware::from_fn_with_state(gate, authorize));
/// ```
pub async fn authorize(
    State(gate): State<Arc<AuthGate>>,
    mut request: Request,
    next: Next,
) -> Response {
    match gate.admit(request.uri().path(), request.headers()) {
        Ok(Admission::Exempt) => next.run(request).await,
        Ok(Admission::Authorized(claims)) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

/// 인증된 사용자 추출기.
///
/// 게이트가 첨부한 클레임을 꺼냅니다. 면제 경로에서는 클레임이 없으므로
/// `TokenMissing`으로 거부됩니다.
///
/// ```rust,ignore
/// async fn handler(AuthUser(claims): AuthUser) -> impl IntoResponse {
///     format!("user {}", claims.user_id())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser(pub AccessClaims);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AccessClaims>()
            .cloned()
            .map(AuthUser)
            .ok_or(AuthError::TokenMissing)
    }
}
