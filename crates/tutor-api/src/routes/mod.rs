//! HTTP 라우트.
//!
//! 모든 API 경로는 `/{version}/{env}/{surface}/…` 형태이며, 인가 게이트가
//! 접두사를 제거한 논리 경로로 판정합니다.

mod health;
mod token;

pub use health::{ping, PingResponse};
pub use token::{generate_access_token, logout_all_devices, AccessTokenResponse, LogoutResponse};

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::auth::authorize;
use crate::middleware::metrics_layer;
use crate::state::AppState;

/// 게이트가 적용된 API 라우터 생성.
///
/// `/metrics`처럼 게이트 밖에 있어야 하는 라우트는 호출자가 병합합니다.
pub fn create_router(state: Arc<AppState>) -> Router {
    let gate = state.gate.clone();

    Router::new()
        .route("/{version}/{env}/{surface}/ping", get(ping))
        .route(
            "/{version}/{env}/{surface}/generate_access_token",
            get(generate_access_token),
        )
        .route(
            "/{version}/{env}/{surface}/logout_all_devices",
            post(logout_all_devices),
        )
        .with_state(state)
        .layer(middleware::from_fn_with_state(gate, authorize))
        .layer(middleware::from_fn(metrics_layer))
}
