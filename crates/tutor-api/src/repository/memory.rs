//! 메모리 기반 저장소.
//!
//! 데이터베이스 URL이 없을 때와 테스트에서 사용합니다. 프로세스가 종료되면
//! 모든 세션이 사라집니다.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use tutor_core::{
    IdentityStore, NewUser, RefreshCredential, RefreshTokenStore, StoreResult, UserId, UserRecord,
    WorkspaceRole,
};
use uuid::Uuid;

/// 메모리 사용자 저장소.
#[derive(Debug)]
pub struct InMemoryIdentityStore {
    users: RwLock<HashMap<UserId, UserRecord>>,
    next_id: AtomicI64,
}

impl Default for InMemoryIdentityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// 레코드를 그대로 저장합니다. 같은 ID가 있으면 덮어씁니다.
    pub async fn insert_user(&self, user: UserRecord) {
        self.next_id.fetch_max(user.user_id + 1, Ordering::SeqCst);
        self.users.write().await.insert(user.user_id, user);
    }

    /// 워크스페이스 역할 변경. 사용자가 없으면 false.
    pub async fn set_workspace_role(
        &self,
        user_id: UserId,
        workspace: &str,
        role: WorkspaceRole,
    ) -> bool {
        match self.users.write().await.get_mut(&user_id) {
            Some(user) => {
                user.workspace_role.insert(workspace.to_string(), role);
                true
            }
            None => false,
        }
    }

    /// 시스템 관리자 플래그 변경. 사용자가 없으면 false.
    pub async fn set_system_admin(&self, user_id: UserId, system_admin: bool) -> bool {
        match self.users.write().await.get_mut(&user_id) {
            Some(user) => {
                user.system_admin = system_admin;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn find_by_id(&self, user_id: UserId) -> StoreResult<Option<UserRecord>> {
        Ok(self.users.read().await.get(&user_id).cloned())
    }

    async fn record_sign_in(
        &self,
        user: &NewUser,
        metadata: &Value,
        at: DateTime<Utc>,
    ) -> StoreResult<UserRecord> {
        let mut users = self.users.write().await;

        if let Some(existing) = users.values_mut().find(|u| u.email == user.email) {
            existing.last_login = Some(at);
            existing.last_auth_metadata = Some(metadata.clone());
            return Ok(existing.clone());
        }

        let user_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = UserRecord {
            user_id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            system_admin: false,
            workspace_role: user.workspace_role.clone(),
            student_id: user.student_id.clone(),
            profile_img_url: user.profile_img_url.clone(),
            last_login: Some(at),
            last_auth_metadata: Some(metadata.clone()),
        };
        users.insert(user_id, record.clone());
        Ok(record)
    }
}

/// 메모리 Refresh Token 저장소.
#[derive(Debug, Default)]
pub struct InMemoryRefreshTokenStore {
    // secret -> record
    tokens: RwLock<HashMap<String, RefreshCredential>>,
}

impl InMemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tokens.read().await.is_empty()
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn insert(&self, credential: &RefreshCredential) -> StoreResult<()> {
        let mut tokens = self.tokens.write().await;
        if tokens.contains_key(&credential.secret) {
            return Err(tutor_core::StoreError::Conflict(credential.token_id.to_string()));
        }
        tokens.insert(credential.secret.clone(), credential.clone());
        Ok(())
    }

    async fn find_by_secret(&self, secret: &str) -> StoreResult<Option<RefreshCredential>> {
        Ok(self.tokens.read().await.get(secret).cloned())
    }

    async fn record_issuance(&self, token_id: Uuid, at: DateTime<Utc>) -> StoreResult<bool> {
        let mut tokens = self.tokens.write().await;
        match tokens.values_mut().find(|c| c.token_id == token_id) {
            Some(credential) => {
                credential.issued_access_token_count += 1;
                credential.last_access_token_issued_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn expire_all_for_user(&self, user_id: UserId, at: DateTime<Utc>) -> StoreResult<u64> {
        let mut tokens = self.tokens.write().await;
        let mut expired = 0;
        for credential in tokens
            .values_mut()
            .filter(|c| c.user_id == user_id && !c.is_expired_at(at))
        {
            credential.expires_at = at;
            expired += 1;
        }
        Ok(expired)
    }
}
