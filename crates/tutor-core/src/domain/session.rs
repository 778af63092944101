//! Refresh Token 레코드와 저장소 경계.
//!
//! # 폐기 모델
//!
//! 별도의 폐기 플래그는 없습니다. `expires_at <= now`이면 폐기된 것으로 보며,
//! 자연 만료와 강제 폐기(로그아웃)가 같은 필드로 표현됩니다. 폐기는
//! `expires_at`을 현재 시각으로 당기는 것으로 구현합니다.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::UserId;
use crate::error::StoreResult;

/// 로그인 세션당 하나씩 생성되는 Refresh Token 레코드.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshCredential {
    pub token_id: Uuid,
    pub user_id: UserId,
    /// Bearer 값으로 쓰이는 비밀 문자열
    pub secret: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// 로그인 출처 메타데이터
    pub auth_metadata: Value,
    /// 이 세션으로 발급된 Access Token 수 (모니터링 용도)
    pub issued_access_token_count: i64,
    pub last_access_token_issued_at: Option<DateTime<Utc>>,
}

impl RefreshCredential {
    /// 새 세션 레코드 생성.
    ///
    /// `token_id`와 `secret`은 서로 독립적인 무작위 UUIDv4입니다.
    pub fn new(user_id: UserId, auth_metadata: Value, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            token_id: Uuid::new_v4(),
            user_id,
            secret: Uuid::new_v4().to_string(),
            created_at: now,
            expires_at: now + ttl,
            auth_metadata,
            issued_access_token_count: 0,
            last_access_token_issued_at: None,
        }
    }

    /// 만료 또는 폐기 여부 (`expires_at <= now`).
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Refresh Token 저장소.
///
/// 행 단위 갱신의 원자성은 구현체가 보장합니다. 특히 [`record_issuance`]는
/// 동시 호출에서도 증가분을 잃지 않아야 합니다.
///
/// [`record_issuance`]: RefreshTokenStore::record_issuance
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// 새 레코드 저장.
    async fn insert(&self, credential: &RefreshCredential) -> StoreResult<()>;

    /// 비밀 문자열로 조회. 캐시 없이 항상 최신 값을 읽어야 합니다.
    async fn find_by_secret(&self, secret: &str) -> StoreResult<Option<RefreshCredential>>;

    /// 발급 카운터 증가 및 마지막 발급 시각 기록.
    ///
    /// 레코드가 없으면 `false`를 반환합니다.
    async fn record_issuance(&self, token_id: Uuid, at: DateTime<Utc>) -> StoreResult<bool>;

    /// 사용자의 만료되지 않은 모든 레코드를 `at` 시각으로 만료시킵니다.
    ///
    /// 만료 처리된 레코드 수를 반환합니다.
    async fn expire_all_for_user(&self, user_id: UserId, at: DateTime<Utc>) -> StoreResult<u64>;
}
