//! 세션 수명 주기.
//!
//! 로그인 시 Refresh Token을 만들고, Refresh Token으로 Access Token을 재발급하며,
//! 사용자의 모든 세션을 폐기합니다.
//!
//! # 발급 규칙
//!
//! Access Token은 항상 **발급 시점의** 사용자 레코드로 서명됩니다. 로그인 이후
//! 바뀐 역할이나 멤버십은 다음 발급부터 반영됩니다.
//!
//! 저장소 호출은 모두 deadline으로 감싸며, 시간 초과나 저장소 장애는
//! 토큰을 발급하지 않는 쪽으로 처리합니다.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use serde_json::Value;
use tracing::{debug, error, info, warn};
use tutor_core::{
    AuthConfig, IdentityStore, NewUser, RefreshCredential, RefreshTokenStore, SignInProfile,
    SignInSource, StoreError, StoreResult, UserId,
};

use super::error::AuthError;
use super::jwt::TokenCodec;
use crate::metrics::{record_refresh_issuance, record_session_event};

/// 로그인 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInOutcome {
    pub user_id: UserId,
    pub refresh_token: String,
}

/// 세션 서비스.
pub struct SessionService {
    identities: Arc<dyn IdentityStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    codec: Arc<TokenCodec>,
    refresh_ttl: Duration,
    store_timeout: StdDuration,
    default_workspace: Option<String>,
}

impl std::fmt::Debug for SessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService")
            .field("refresh_ttl", &self.refresh_ttl)
            .field("store_timeout", &self.store_timeout)
            .field("default_workspace", &self.default_workspace)
            .finish_non_exhaustive()
    }
}

impl SessionService {
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        codec: Arc<TokenCodec>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            identities,
            refresh_tokens,
            codec,
            refresh_ttl: Duration::days(config.refresh_token_ttl_days),
            store_timeout: StdDuration::from_millis(config.store_timeout_ms),
            default_workspace: config.default_workspace.clone(),
        }
    }

    /// 외부 제공자 로그인 처리.
    ///
    /// 이메일 기준으로 사용자를 upsert한 뒤 새 Refresh Token을 만듭니다.
    /// 메타데이터에는 `signin_source`가 기록됩니다.
    pub async fn sign_in(
        &self,
        source: SignInSource,
        profile: &SignInProfile,
        metadata: Value,
    ) -> StoreResult<SignInOutcome> {
        let metadata = stamp_source(metadata, source);
        let new_user = NewUser::from_profile(profile, self.default_workspace.as_deref());

        let user = self
            .bounded(
                "record_sign_in",
                self.identities.record_sign_in(&new_user, &metadata, Utc::now()),
            )
            .await?;

        let refresh_token = self.create_refresh_token(user.user_id, metadata).await?;
        info!(user_id = user.user_id, source = source.as_str(), "로그인 완료");

        Ok(SignInOutcome {
            user_id: user.user_id,
            refresh_token,
        })
    }

    /// 새 Refresh Token 생성.
    ///
    /// 로그인마다 독립된 레코드가 만들어지며 비밀 문자열을 반환합니다.
    pub async fn create_refresh_token(
        &self,
        user_id: UserId,
        auth_metadata: Value,
    ) -> StoreResult<String> {
        let credential = RefreshCredential::new(user_id, auth_metadata, Utc::now(), self.refresh_ttl);
        self.bounded("insert", self.refresh_tokens.insert(&credential))
            .await?;

        record_session_event("created");
        Ok(credential.secret)
    }

    /// Refresh Token으로 Access Token 발급.
    ///
    /// # Errors
    ///
    /// - `AuthError::RefreshNotFound`: 레코드 없음, 사용자 없음, 저장소 장애, 서명 실패
    /// - `AuthError::RefreshExpired`: 만료 또는 폐기됨 (`expires_at <= now`)
    pub async fn issue_access_token(&self, secret: &str) -> Result<String, AuthError> {
        let credential = self
            .bounded("find_by_secret", self.refresh_tokens.find_by_secret(secret))
            .await
            .map_err(|e| self.store_failure("find_by_secret", e))?
            .ok_or_else(|| {
                record_refresh_issuance("not_found");
                AuthError::RefreshNotFound
            })?;

        // 조회가 끝난 뒤의 시각으로 비교해야 조회 중 커밋된 폐기가 반영됨
        let now = Utc::now();
        if credential.is_expired_at(now) {
            info!(
                user_id = credential.user_id,
                token_id = %credential.token_id,
                "만료된 Refresh Token으로 발급 요청"
            );
            record_refresh_issuance("expired");
            return Err(AuthError::RefreshExpired);
        }

        let user = self
            .bounded("find_by_id", self.identities.find_by_id(credential.user_id))
            .await
            .map_err(|e| self.store_failure("find_by_id", e))?
            .ok_or_else(|| {
                warn!(user_id = credential.user_id, "Refresh Token의 사용자가 존재하지 않음");
                record_refresh_issuance("not_found");
                AuthError::RefreshNotFound
            })?;

        let token = self
            .codec
            .sign_at(&user.identity_claims(), now)
            .map_err(|e| {
                error!(user_id = user.user_id, error = %e, "Access Token 서명 실패");
                record_refresh_issuance("store_error");
                AuthError::RefreshNotFound
            })?;

        let recorded = self
            .bounded(
                "record_issuance",
                self.refresh_tokens.record_issuance(credential.token_id, now),
            )
            .await
            .map_err(|e| self.store_failure("record_issuance", e))?;
        if !recorded {
            // 조회와 기록 사이에 레코드가 사라짐
            record_refresh_issuance("not_found");
            return Err(AuthError::RefreshNotFound);
        }

        debug!(
            user_id = user.user_id,
            token_id = %credential.token_id,
            "Access Token 발급"
        );
        record_refresh_issuance("issued");
        Ok(token)
    }

    /// 사용자의 모든 세션 폐기.
    ///
    /// 이미 발급된 Access Token은 자연 만료될 때까지 유효합니다.
    pub async fn revoke_all(&self, user_id: UserId) -> StoreResult<u64> {
        let revoked = self
            .bounded(
                "expire_all_for_user",
                self.refresh_tokens.expire_all_for_user(user_id, Utc::now()),
            )
            .await?;

        info!(user_id, revoked, "모든 세션 폐기");
        record_session_event("revoked_all");
        Ok(revoked)
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        tokio::time::timeout(self.store_timeout, fut)
            .await
            .map_err(|_| StoreError::Timeout(operation))?
    }

    fn store_failure(&self, operation: &'static str, err: StoreError) -> AuthError {
        error!(
            operation,
            error = %err,
            transient = err.is_transient(),
            "저장소 오류로 발급 거부"
        );
        record_refresh_issuance("store_error");
        AuthError::RefreshNotFound
    }
}

fn stamp_source(metadata: Value, source: SignInSource) -> Value {
    let mut metadata = match metadata {
        Value::Object(map) => map,
        Value::Null => serde_json::Map::new(),
        other => {
            let mut map = serde_json::Map::new();
            map.insert("provider_data".to_string(), other);
            map
        }
    };
    metadata.insert(
        "signin_source".to_string(),
        Value::String(source.as_str().to_string()),
    );
    Value::Object(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{InMemoryIdentityStore, InMemoryRefreshTokenStore};
    use async_trait::async_trait;
    use serde_json::json;
    use tutor_core::{derive_roles, UserRecord, WorkspaceRole};
    use uuid::Uuid;

    const SIGNING_PRIVATE: &str = include_str!("../../tests/fixtures/signing_private.pem");
    const SIGNING_PUBLIC: &str = include_str!("../../tests/fixtures/signing_public.pem");

    struct Fixture {
        identities: Arc<InMemoryIdentityStore>,
        refresh_tokens: Arc<InMemoryRefreshTokenStore>,
        codec: Arc<TokenCodec>,
        service: SessionService,
    }

    fn codec() -> Arc<TokenCodec> {
        Arc::new(
            TokenCodec::from_pem(
                SIGNING_PRIVATE.as_bytes(),
                SIGNING_PUBLIC.as_bytes(),
                Duration::minutes(30),
            )
            .unwrap(),
        )
    }

    fn fixture() -> Fixture {
        let identities = Arc::new(InMemoryIdentityStore::new());
        let refresh_tokens = Arc::new(InMemoryRefreshTokenStore::new());
        let codec = codec();
        let config = AuthConfig {
            default_workspace: Some("lobby".to_string()),
            ..AuthConfig::default()
        };
        let service = SessionService::new(
            identities.clone(),
            refresh_tokens.clone(),
            codec.clone(),
            &config,
        );
        Fixture {
            identities,
            refresh_tokens,
            codec,
            service,
        }
    }

    fn profile(email: &str) -> SignInProfile {
        SignInProfile {
            email: email.to_string(),
            first_name: "Katherine".to_string(),
            last_name: "Johnson".to_string(),
            ..SignInProfile::default()
        }
    }

    #[tokio::test]
    async fn test_sign_in_then_issue() {
        let f = fixture();
        let outcome = f
            .service
            .sign_in(SignInSource::Google, &profile("kj@example.edu"), json!({"sub": "g-1"}))
            .await
            .unwrap();

        let token = f
            .service
            .issue_access_token(&outcome.refresh_token)
            .await
            .unwrap();
        let claims = f.codec.verify(&token).unwrap();

        assert_eq!(claims.user_id(), outcome.user_id);
        assert_eq!(claims.identity.workspace_role.get("lobby"), Some(&WorkspaceRole::Student));

        let stored = f
            .refresh_tokens
            .find_by_secret(&outcome.refresh_token)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.auth_metadata["signin_source"], "google");
        assert_eq!(stored.auth_metadata["sub"], "g-1");
        assert_eq!(stored.issued_access_token_count, 1);
    }

    #[tokio::test]
    async fn test_repeat_sign_in_keeps_user() {
        let f = fixture();
        let first = f
            .service
            .sign_in(SignInSource::Email, &profile("kj@example.edu"), Value::Null)
            .await
            .unwrap();
        let second = f
            .service
            .sign_in(SignInSource::Google, &profile("kj@example.edu"), Value::Null)
            .await
            .unwrap();

        assert_eq!(first.user_id, second.user_id);
        assert_ne!(first.refresh_token, second.refresh_token);
    }

    #[tokio::test]
    async fn test_unknown_secret() {
        let f = fixture();
        assert_eq!(
            f.service.issue_access_token("no-such-token").await,
            Err(AuthError::RefreshNotFound)
        );
        assert_eq!(
            f.service
                .issue_access_token(&Uuid::new_v4().to_string())
                .await,
            Err(AuthError::RefreshNotFound)
        );
    }

    #[tokio::test]
    async fn test_revoke_all_affects_only_owner() {
        let f = fixture();
        let alice = f
            .service
            .sign_in(SignInSource::Email, &profile("alice@example.edu"), Value::Null)
            .await
            .unwrap();
        let alice_other_device = f
            .service
            .create_refresh_token(alice.user_id, Value::Null)
            .await
            .unwrap();
        let bob = f
            .service
            .sign_in(SignInSource::Email, &profile("bob@example.edu"), Value::Null)
            .await
            .unwrap();

        let revoked = f.service.revoke_all(alice.user_id).await.unwrap();
        assert_eq!(revoked, 2);

        assert_eq!(
            f.service.issue_access_token(&alice.refresh_token).await,
            Err(AuthError::RefreshExpired)
        );
        assert_eq!(
            f.service.issue_access_token(&alice_other_device).await,
            Err(AuthError::RefreshExpired)
        );
        assert!(f.service.issue_access_token(&bob.refresh_token).await.is_ok());

        // 이미 폐기된 세션은 다시 세지 않음
        assert_eq!(f.service.revoke_all(alice.user_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_issuance_count_strictly_increases() {
        let f = fixture();
        let outcome = f
            .service
            .sign_in(SignInSource::Email, &profile("kj@example.edu"), Value::Null)
            .await
            .unwrap();

        let mut last = 0;
        for _ in 0..3 {
            f.service
                .issue_access_token(&outcome.refresh_token)
                .await
                .unwrap();
            let stored = f
                .refresh_tokens
                .find_by_secret(&outcome.refresh_token)
                .await
                .unwrap()
                .unwrap();
            assert!(stored.issued_access_token_count > last);
            assert!(stored.last_access_token_issued_at.is_some());
            last = stored.issued_access_token_count;
        }
        assert_eq!(last, 3);
    }

    #[tokio::test]
    async fn test_role_change_reflected_on_next_issue() {
        let f = fixture();
        let outcome = f
            .service
            .sign_in(SignInSource::Email, &profile("kj@example.edu"), Value::Null)
            .await
            .unwrap();

        let before = f
            .codec
            .verify(&f.service.issue_access_token(&outcome.refresh_token).await.unwrap())
            .unwrap();
        assert!(!derive_roles(&before).teacher);

        f.identities
            .set_workspace_role(outcome.user_id, "lobby", WorkspaceRole::Teacher)
            .await;

        let after = f
            .codec
            .verify(&f.service.issue_access_token(&outcome.refresh_token).await.unwrap())
            .unwrap();
        assert!(derive_roles(&after).teacher);
    }

    #[tokio::test]
    async fn test_deleted_user_cannot_refresh() {
        let f = fixture();
        let secret = f
            .service
            .create_refresh_token(9999, Value::Null)
            .await
            .unwrap();

        assert_eq!(
            f.service.issue_access_token(&secret).await,
            Err(AuthError::RefreshNotFound)
        );
    }

    struct FailingStore;

    #[async_trait]
    impl RefreshTokenStore for FailingStore {
        async fn insert(&self, _credential: &RefreshCredential) -> StoreResult<()> {
            Err(StoreError::Database("connection refused".to_string()))
        }

        async fn find_by_secret(&self, _secret: &str) -> StoreResult<Option<RefreshCredential>> {
            Err(StoreError::Database("connection refused".to_string()))
        }

        async fn record_issuance(
            &self,
            _token_id: Uuid,
            _at: chrono::DateTime<Utc>,
        ) -> StoreResult<bool> {
            Err(StoreError::Database("connection refused".to_string()))
        }

        async fn expire_all_for_user(
            &self,
            _user_id: UserId,
            _at: chrono::DateTime<Utc>,
        ) -> StoreResult<u64> {
            Err(StoreError::Database("connection refused".to_string()))
        }
    }

    struct StalledStore;

    #[async_trait]
    impl RefreshTokenStore for StalledStore {
        async fn insert(&self, _credential: &RefreshCredential) -> StoreResult<()> {
            std::future::pending().await
        }

        async fn find_by_secret(&self, _secret: &str) -> StoreResult<Option<RefreshCredential>> {
            std::future::pending().await
        }

        async fn record_issuance(
            &self,
            _token_id: Uuid,
            _at: chrono::DateTime<Utc>,
        ) -> StoreResult<bool> {
            std::future::pending().await
        }

        async fn expire_all_for_user(
            &self,
            _user_id: UserId,
            _at: chrono::DateTime<Utc>,
        ) -> StoreResult<u64> {
            std::future::pending().await
        }
    }

    /// 조회 도중 같은 사용자의 세션 폐기가 커밋되는 저장소.
    struct RevokedDuringRead {
        inner: Arc<InMemoryRefreshTokenStore>,
    }

    #[async_trait]
    impl RefreshTokenStore for RevokedDuringRead {
        async fn insert(&self, credential: &RefreshCredential) -> StoreResult<()> {
            self.inner.insert(credential).await
        }

        async fn find_by_secret(&self, secret: &str) -> StoreResult<Option<RefreshCredential>> {
            let Some(credential) = self.inner.find_by_secret(secret).await? else {
                return Ok(None);
            };
            self.inner
                .expire_all_for_user(credential.user_id, Utc::now())
                .await?;
            self.inner.find_by_secret(secret).await
        }

        async fn record_issuance(
            &self,
            token_id: Uuid,
            at: chrono::DateTime<Utc>,
        ) -> StoreResult<bool> {
            self.inner.record_issuance(token_id, at).await
        }

        async fn expire_all_for_user(
            &self,
            user_id: UserId,
            at: chrono::DateTime<Utc>,
        ) -> StoreResult<u64> {
            self.inner.expire_all_for_user(user_id, at).await
        }
    }

    fn service_with(store: Arc<dyn RefreshTokenStore>) -> SessionService {
        SessionService::new(
            Arc::new(InMemoryIdentityStore::new()),
            store,
            codec(),
            &AuthConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_store_failure_fails_closed() {
        let service = service_with(Arc::new(FailingStore));

        assert_eq!(
            service.issue_access_token("anything").await,
            Err(AuthError::RefreshNotFound)
        );
        assert!(matches!(
            service.revoke_all(1).await,
            Err(StoreError::Database(_))
        ));
    }

    #[tokio::test]
    async fn test_revoke_committed_during_read_is_honored() {
        let identities = Arc::new(InMemoryIdentityStore::new());
        let service = SessionService::new(
            identities,
            Arc::new(RevokedDuringRead {
                inner: Arc::new(InMemoryRefreshTokenStore::new()),
            }),
            codec(),
            &AuthConfig::default(),
        );
        let outcome = service
            .sign_in(SignInSource::Email, &profile("kj@example.edu"), Value::Null)
            .await
            .unwrap();

        assert_eq!(
            service.issue_access_token(&outcome.refresh_token).await,
            Err(AuthError::RefreshExpired)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_timeout_fails_closed() {
        let service = service_with(Arc::new(StalledStore));

        assert_eq!(
            service.issue_access_token("anything").await,
            Err(AuthError::RefreshNotFound)
        );
        assert!(matches!(
            service.create_refresh_token(1, Value::Null).await,
            Err(StoreError::Timeout("insert"))
        ));
    }

    #[test]
    fn test_stamp_source() {
        let stamped = stamp_source(json!({"sub": "x"}), SignInSource::CampusSso);
        assert_eq!(stamped, json!({"sub": "x", "signin_source": "campus_sso"}));

        let stamped = stamp_source(Value::Null, SignInSource::Email);
        assert_eq!(stamped, json!({"signin_source": "email"}));

        let stamped = stamp_source(json!("raw"), SignInSource::Google);
        assert_eq!(stamped["provider_data"], "raw");
    }

    #[tokio::test]
    async fn test_user_record_snapshot_is_current() {
        let f = fixture();
        f.identities
            .insert_user(UserRecord {
                user_id: 500,
                email: "root@example.edu".to_string(),
                first_name: "Root".to_string(),
                last_name: "Admin".to_string(),
                system_admin: true,
                workspace_role: Default::default(),
                student_id: String::new(),
                profile_img_url: String::new(),
                last_login: None,
                last_auth_metadata: None,
            })
            .await;
        let secret = f
            .service
            .create_refresh_token(500, Value::Null)
            .await
            .unwrap();

        let claims = f
            .codec
            .verify(&f.service.issue_access_token(&secret).await.unwrap())
            .unwrap();
        assert!(derive_roles(&claims).admin);
    }
}
