//! 사용자 레코드 PostgreSQL 저장소.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{types::Json, FromRow, PgPool};
use tutor_core::{IdentityStore, NewUser, StoreResult, UserId, UserRecord, WorkspaceMembership};

use super::store_error;

/// users 테이블 행.
#[derive(Debug, FromRow)]
struct UserRow {
    user_id: i64,
    email: String,
    first_name: String,
    last_name: String,
    system_admin: bool,
    workspace_role: Json<WorkspaceMembership>,
    student_id: String,
    profile_img_url: String,
    #[sqlx(default)]
    last_login: Option<DateTime<Utc>>,
    #[sqlx(default)]
    last_auth_metadata: Option<Json<Value>>,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            user_id: row.user_id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            system_admin: row.system_admin,
            workspace_role: row.workspace_role.0,
            student_id: row.student_id,
            profile_img_url: row.profile_img_url,
            last_login: row.last_login,
            last_auth_metadata: row.last_auth_metadata.map(|m| m.0),
        }
    }
}

const USER_COLUMNS: &str = "user_id, email, first_name, last_name, system_admin, workspace_role, \
     student_id, profile_img_url, last_login, last_auth_metadata";

/// PostgreSQL 사용자 저장소.
#[derive(Debug, Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn find_by_id(&self, user_id: UserId) -> StoreResult<Option<UserRecord>> {
        let query = format!("SELECT {} FROM users WHERE user_id = $1", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;

        Ok(row.map(UserRecord::from))
    }

    async fn record_sign_in(
        &self,
        user: &NewUser,
        metadata: &Value,
        at: DateTime<Utc>,
    ) -> StoreResult<UserRecord> {
        // 기존 사용자는 로그인 시각과 메타데이터만 갱신
        let query = format!(
            r#"
            INSERT INTO users (
                email, first_name, last_name, workspace_role,
                student_id, profile_img_url, last_login, last_auth_metadata
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (email) DO UPDATE SET
                last_login = EXCLUDED.last_login,
                last_auth_metadata = EXCLUDED.last_auth_metadata
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(&user.email)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(Json(&user.workspace_role))
            .bind(&user.student_id)
            .bind(&user.profile_img_url)
            .bind(at)
            .bind(Json(metadata))
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)?;

        Ok(row.into())
    }
}
