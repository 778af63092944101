//! 사용자 신원 레코드.
//!
//! 사용자 레코드의 저장은 외부 협력자가 담당하며, 이 모듈은 인증 서브시스템이
//! 읽고 도출하는 데 필요한 형태와 [`IdentityStore`] 경계만 정의합니다.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::IdentityClaims;
use crate::error::StoreResult;

/// 사용자 ID.
pub type UserId = i64;

/// 워크스페이스(테넌트) ID.
pub type WorkspaceId = String;

/// 워크스페이스 내 멤버십 역할.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceRole {
    /// 가입 승인 대기
    Pending,
    /// 학생
    Student,
    /// 교사
    Teacher,
}

/// 워크스페이스 ID → 역할 매핑.
pub type WorkspaceMembership = BTreeMap<WorkspaceId, WorkspaceRole>;

/// 사용자 신원 레코드.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub system_admin: bool,
    pub workspace_role: WorkspaceMembership,
    pub student_id: String,
    pub profile_img_url: String,
    /// 마지막 로그인 시각
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
    /// 마지막 로그인 시 외부 제공자가 넘겨준 메타데이터
    #[serde(default)]
    pub last_auth_metadata: Option<Value>,
}

impl UserRecord {
    /// 현재 레코드 상태로부터 클레임 스냅샷을 만듭니다.
    pub fn identity_claims(&self) -> IdentityClaims {
        IdentityClaims {
            user_id: self.user_id,
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            system_admin: self.system_admin,
            workspace_role: self.workspace_role.clone(),
            student_id: self.student_id.clone(),
            profile_img_url: self.profile_img_url.clone(),
        }
    }
}

/// 로그인 경로.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignInSource {
    /// Google OAuth
    Google,
    /// 이메일 OTP
    Email,
    /// 학교 SSO
    CampusSso,
}

impl SignInSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignInSource::Google => "google",
            SignInSource::Email => "email",
            SignInSource::CampusSso => "campus_sso",
        }
    }
}

/// 외부 제공자에서 넘어온 사용자 프로필.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignInProfile {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub profile_img_url: Option<String>,
}

/// 신규 사용자 생성 시 사용할 값.
///
/// 이메일이 이미 존재하면 저장소는 이 값들을 무시하고 로그인 시각과
/// 메타데이터만 갱신합니다.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub workspace_role: WorkspaceMembership,
    pub student_id: String,
    pub profile_img_url: String,
}

impl NewUser {
    /// 프로필과 기본 워크스페이스로부터 신규 사용자 값을 구성합니다.
    ///
    /// 기본 워크스페이스가 주어지면 해당 워크스페이스의 학생으로 등록하고,
    /// 프로필 이미지가 없으면 이름 기반 아바타 URL을 생성합니다.
    pub fn from_profile(profile: &SignInProfile, default_workspace: Option<&str>) -> Self {
        let mut workspace_role = WorkspaceMembership::new();
        if let Some(workspace) = default_workspace {
            workspace_role.insert(workspace.to_string(), WorkspaceRole::Student);
        }

        let profile_img_url = profile
            .profile_img_url
            .clone()
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| default_avatar_url(&profile.first_name, &profile.last_name));

        Self {
            email: profile.email.clone(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            workspace_role,
            student_id: profile.student_id.clone().unwrap_or_default(),
            profile_img_url,
        }
    }
}

fn default_avatar_url(first_name: &str, last_name: &str) -> String {
    format!(
        "https://api.dicebear.com/9.x/notionists-neutral/png?seed={}{}",
        first_name, last_name
    )
}

/// 사용자 레코드 저장소.
///
/// 인증 서브시스템이 외부 저장소에 요구하는 최소 인터페이스입니다.
/// 모든 메서드는 I/O 지점이며 호출자는 in-process lock을 잡은 채로 호출하지 않습니다.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// ID로 사용자 조회.
    async fn find_by_id(&self, user_id: UserId) -> StoreResult<Option<UserRecord>>;

    /// 이메일 기준 upsert.
    ///
    /// 기존 사용자는 `last_login`, `last_auth_metadata`만 갱신하고,
    /// 없으면 `user`의 값으로 새 레코드를 생성합니다.
    async fn record_sign_in(
        &self,
        user: &NewUser,
        metadata: &Value,
        at: DateTime<Utc>,
    ) -> StoreResult<UserRecord>;
}
