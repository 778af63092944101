//! Refresh Token PostgreSQL 저장소.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{types::Json, FromRow, PgPool};
use tutor_core::{RefreshCredential, RefreshTokenStore, StoreResult, UserId};
use uuid::Uuid;

use super::store_error;

/// refresh_tokens 테이블 행.
#[derive(Debug, FromRow)]
struct RefreshTokenRow {
    token_id: Uuid,
    user_id: i64,
    secret: Uuid,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    auth_metadata: Json<Value>,
    issued_access_token_count: i64,
    #[sqlx(default)]
    last_access_token_issued_at: Option<DateTime<Utc>>,
}

impl From<RefreshTokenRow> for RefreshCredential {
    fn from(row: RefreshTokenRow) -> Self {
        Self {
            token_id: row.token_id,
            user_id: row.user_id,
            secret: row.secret.to_string(),
            created_at: row.created_at,
            expires_at: row.expires_at,
            auth_metadata: row.auth_metadata.0,
            issued_access_token_count: row.issued_access_token_count,
            last_access_token_issued_at: row.last_access_token_issued_at,
        }
    }
}

/// PostgreSQL Refresh Token 저장소.
#[derive(Debug, Clone)]
pub struct PgRefreshTokenStore {
    pool: PgPool,
}

impl PgRefreshTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStore for PgRefreshTokenStore {
    async fn insert(&self, credential: &RefreshCredential) -> StoreResult<()> {
        let secret = Uuid::parse_str(&credential.secret)
            .map_err(|e| tutor_core::StoreError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (
                token_id, user_id, secret, created_at, expires_at,
                auth_metadata, issued_access_token_count, last_access_token_issued_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(credential.token_id)
        .bind(credential.user_id)
        .bind(secret)
        .bind(credential.created_at)
        .bind(credential.expires_at)
        .bind(Json(&credential.auth_metadata))
        .bind(credential.issued_access_token_count)
        .bind(credential.last_access_token_issued_at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(())
    }

    async fn find_by_secret(&self, secret: &str) -> StoreResult<Option<RefreshCredential>> {
        // UUID 형식이 아니면 존재할 수 없는 값
        let Ok(secret) = Uuid::parse_str(secret) else {
            return Ok(None);
        };

        let row = sqlx::query_as::<_, RefreshTokenRow>(
            r#"
            SELECT token_id, user_id, secret, created_at, expires_at,
                   auth_metadata, issued_access_token_count, last_access_token_issued_at
            FROM refresh_tokens
            WHERE secret = $1
            "#,
        )
        .bind(secret)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(row.map(RefreshCredential::from))
    }

    async fn record_issuance(&self, token_id: Uuid, at: DateTime<Utc>) -> StoreResult<bool> {
        // 단일 UPDATE로 증가시켜 동시 발급에서도 증가분을 잃지 않음
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET issued_access_token_count = issued_access_token_count + 1,
                last_access_token_issued_at = $2
            WHERE token_id = $1
            "#,
        )
        .bind(token_id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn expire_all_for_user(&self, user_id: UserId, at: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET expires_at = $2
            WHERE user_id = $1 AND expires_at > $2
            "#,
        )
        .bind(user_id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(result.rows_affected())
    }
}
