//! # Tutor Core
//!
//! 교육 플랫폼 인증/인가 서브시스템의 핵심 도메인 모델을 제공합니다.
//!
//! 이 크레이트는 HTTP나 암호화에 의존하지 않는 순수 로직만 포함합니다:
//! - 사용자 신원 레코드 및 워크스페이스 멤버십
//! - Access Token 클레임 구조체
//! - 클레임으로부터의 역할 도출
//! - 경로 패턴 기반 접근 정책 매처
//! - Refresh Token 레코드 및 영속성 trait
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
