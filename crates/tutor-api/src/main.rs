//! Tutor API 서버 진입점.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{extract::State, http::StatusCode, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tutor_api::repository::{
    self, InMemoryIdentityStore, InMemoryRefreshTokenStore, PgIdentityStore, PgRefreshTokenStore,
};
use tutor_api::{create_router, metrics::setup_metrics_recorder, AppState, AuthGate, SessionService, TokenCodec};
use tutor_core::{init_logging, AppConfig, IdentityStore, LogConfig, RefreshTokenStore, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 파일 로드 (있는 경우)
    let _ = dotenvy::dotenv();

    let config = AppConfig::load_default().context("설정 로드 실패")?;

    init_logging(LogConfig::from_settings(&config.logging))
        .map_err(|e| anyhow::anyhow!("로깅 초기화 실패: {}", e))?;

    info!("Starting Tutor API server...");

    let metrics_handle = setup_metrics_recorder().context("Prometheus 레코더 설치 실패")?;

    // 키 또는 정책이 잘못되면 시작하지 않음
    let codec = Arc::new(TokenCodec::from_config(&config.auth).context("토큰 키 로드 실패")?);
    let gate = Arc::new(
        AuthGate::from_config(codec.clone(), &config.access).context("접근 정책 로드 실패")?,
    );
    info!(
        policy_entries = config.access.policy.len(),
        prefix_depth = config.access.prefix_depth,
        "Authorization gate ready"
    );

    let (identities, refresh_tokens): (Arc<dyn IdentityStore>, Arc<dyn RefreshTokenStore>) =
        match config.database.url.as_deref() {
            Some(url) => {
                let pool = repository::connect(&config.database, url)
                    .await
                    .context("데이터베이스 연결 실패")?;
                (
                    Arc::new(PgIdentityStore::new(pool.clone())),
                    Arc::new(PgRefreshTokenStore::new(pool)),
                )
            }
            None => {
                warn!("database.url not set, using in-memory stores (sessions are lost on restart)");
                (
                    Arc::new(InMemoryIdentityStore::new()),
                    Arc::new(InMemoryRefreshTokenStore::new()),
                )
            }
        };

    let sessions = Arc::new(SessionService::new(
        identities,
        refresh_tokens,
        codec,
        &config.auth,
    ));

    let state = Arc::new(AppState::new(gate, sessions));
    let app = build_app(state, metrics_handle, &config.server);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("서버 주소 파싱 실패")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("{} 바인드 실패", addr))?;
    info!(%addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("서버 실행 실패")?;

    info!("Server shutdown complete");
    Ok(())
}

/// 전체 라우터 생성.
fn build_app(state: Arc<AppState>, metrics_handle: PrometheusHandle, server: &ServerConfig) -> Router {
    // 메트릭 라우터 (게이트 밖)
    let metrics_router = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics_handle);

    Router::new()
        .merge(metrics_router)
        .merge(create_router(state))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(server.request_timeout_secs),
        ))
        .layer(cors_layer(&server.cors_origins))
}

/// CORS 레이어 생성.
///
/// 허용 origin이 비어 있으면 모든 origin을 허용합니다 (개발 모드).
fn cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<_> = origins
        .iter()
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    let allow_origin = if parsed.is_empty() {
        warn!("No valid CORS origins configured, allowing any origin (development mode)");
        AllowOrigin::any()
    } else {
        info!("CORS configured with {} allowed origins", parsed.len());
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            axum::http::header::ACCEPT,
        ])
        .max_age(Duration::from_secs(3600))
}

/// /metrics 엔드포인트 핸들러.
async fn metrics_handler(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}

/// Graceful shutdown 시그널 대기.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
