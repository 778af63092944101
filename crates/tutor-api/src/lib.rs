//! # Tutor API
//!
//! 교육 플랫폼 API의 토큰 수명 주기와 요청 인가 게이트.
//!
//! # 모듈 구조
//!
//! - [`auth`]: Access Token 코덱, 세션 서비스, 인가 게이트와 미들웨어
//! - [`repository`]: PostgreSQL 및 메모리 저장소
//! - [`routes`]: 토큰 수명 주기 HTTP 엔드포인트
//! - [`state`]: 애플리케이션 공유 상태
//! - [`metrics`]: Prometheus 메트릭
//! - [`error`]: API 응답 봉투

pub mod auth;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod repository;
pub mod routes;
pub mod state;

pub use auth::{AuthError, AuthGate, AuthUser, SessionService, TokenCodec};
pub use error::ApiResponse;
pub use routes::create_router;
pub use state::AppState;
