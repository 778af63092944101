//! 영속성 계층 에러 타입.
//!
//! 사용자 레코드와 Refresh Token 저장소가 반환하는 에러를 정의합니다.

use thiserror::Error;

/// 저장소 에러.
#[derive(Debug, Error)]
pub enum StoreError {
    /// 데이터베이스 에러
    #[error("데이터베이스 에러: {0}")]
    Database(String),

    /// 호출자 deadline 초과
    #[error("저장소 응답 시간 초과: {0}")]
    Timeout(&'static str),

    /// 직렬화 에러
    #[error("직렬화 에러: {0}")]
    Serialization(String),

    /// 유일성 제약 위반
    #[error("중복된 레코드: {0}")]
    Conflict(String),
}

/// 저장소 작업을 위한 Result 타입.
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// 일시적인 장애인지 확인합니다.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Database(_) | StoreError::Timeout(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
