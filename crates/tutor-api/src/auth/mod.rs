//! 인증 및 권한 부여.
//!
//! RS256 Access Token과 서버 측 Refresh Token을 사용하는 2단계 토큰 모델과
//! 경로 기반 접근 제어를 제공합니다.
//!
//! # 구성 요소
//!
//! - [`TokenCodec`]: Access Token 서명/검증
//! - [`SessionService`]: Refresh Token 생성, Access Token 발급, 세션 폐기
//! - [`AuthGate`]: 요청별 인가 판정
//! - [`authorize`]: 게이트를 적용하는 Axum 미들웨어
//! - [`AuthUser`]: 검증된 클레임 추출기
//!
//! # 사용 예시
//!
//! ```rust,ignore
//! async fn protected_handler(AuthUser(claims): AuthUser) -> impl IntoResponse {
//!     format!("Hello, {}!", claims.identity.first_name)
//! }
//! ```

mod bearer;
mod error;
mod gate;
mod jwt;
mod middleware;
mod session;

pub use bearer::BearerTokens;
pub use error::AuthError;
pub use gate::{Admission, AuthGate};
pub use jwt::{KeyError, TokenCodec, TokenError};
pub use middleware::{authorize, AuthUser};
pub use session::{SessionService, SignInOutcome};
