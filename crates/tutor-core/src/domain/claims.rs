//! Access Token 페이로드.
//!
//! 클레임은 영속화되지 않습니다. 서명된 토큰이 만료되면 함께 소멸하며,
//! 만료 전에 무효화하기 위한 서버 측 레코드는 존재하지 않습니다.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{UserId, WorkspaceMembership};

/// 서명 대상이 되는 사용자 신원 정보.
///
/// 발급 시점의 사용자 레코드 스냅샷입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub user_id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub system_admin: bool,
    /// 워크스페이스 ID → 역할 스냅샷
    pub workspace_role: WorkspaceMembership,
    pub student_id: String,
    pub profile_img_url: String,
}

/// 검증된 Access Token 클레임.
///
/// 신원 필드에 `iat`/`exp`(Unix timestamp, 초)가 더해진 형태로 직렬화됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessClaims {
    #[serde(flatten)]
    pub identity: IdentityClaims,
    /// Issued At
    pub iat: i64,
    /// Expiration
    pub exp: i64,
}

impl AccessClaims {
    /// 발급 시각과 유효 기간으로 클레임을 구성합니다.
    pub fn issue(identity: IdentityClaims, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            identity,
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.identity.user_id
    }

    /// 주어진 시각 기준 만료 여부 (`now > exp`).
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() > self.exp
    }
}
