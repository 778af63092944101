//! 저장소 구현.
//!
//! - PostgreSQL: [`PgIdentityStore`], [`PgRefreshTokenStore`]
//! - 메모리: [`InMemoryIdentityStore`], [`InMemoryRefreshTokenStore`] (개발/테스트용)

mod memory;
mod refresh_tokens;
mod users;

pub use memory::{InMemoryIdentityStore, InMemoryRefreshTokenStore};
pub use refresh_tokens::PgRefreshTokenStore;
pub use users::PgIdentityStore;

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;
use tutor_core::{DatabaseConfig, StoreError};

/// 연결 풀 생성 및 선택적 마이그레이션.
pub async fn connect(config: &DatabaseConfig, url: &str) -> Result<PgPool, sqlx::Error> {
    info!("Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
        .connect(url)
        .await?;

    if config.run_migrations {
        info!("Running database migrations...");
        sqlx::migrate!("../../migrations").run(&pool).await?;
        info!("Migrations completed successfully");
    }

    info!("Database connection established");
    Ok(pool)
}

/// sqlx 에러를 저장소 에러로 변환.
pub(crate) fn store_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(db.message().to_string())
        }
        _ => StoreError::Database(err.to_string()),
    }
}
