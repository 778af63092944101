//! 전체 라우터를 통한 토큰 수명 주기 통합 테스트.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header::AUTHORIZATION, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use tutor_api::repository::{InMemoryIdentityStore, InMemoryRefreshTokenStore};
use tutor_api::{create_router, AppState, AuthGate, SessionService, TokenCodec};
use tutor_core::{
    derive_roles, AccessConfig, AuthConfig, SignInProfile, SignInSource, WorkspaceRole,
};

const SIGNING_PRIVATE: &str = include_str!("fixtures/signing_private.pem");
const SIGNING_PUBLIC: &str = include_str!("fixtures/signing_public.pem");

struct TestApp {
    router: Router,
    sessions: Arc<SessionService>,
    identities: Arc<InMemoryIdentityStore>,
    codec: Arc<TokenCodec>,
}

fn test_app() -> TestApp {
    let codec = Arc::new(
        TokenCodec::from_pem(
            SIGNING_PRIVATE.as_bytes(),
            SIGNING_PUBLIC.as_bytes(),
            Duration::minutes(30),
        )
        .unwrap(),
    );
    let gate = Arc::new(AuthGate::from_config(codec.clone(), &AccessConfig::default()).unwrap());
    let identities = Arc::new(InMemoryIdentityStore::new());
    let sessions = Arc::new(SessionService::new(
        identities.clone(),
        Arc::new(InMemoryRefreshTokenStore::new()),
        codec.clone(),
        &AuthConfig {
            default_workspace: Some("lobby".to_string()),
            ..AuthConfig::default()
        },
    ));

    let state = Arc::new(AppState::new(gate, sessions.clone()));
    TestApp {
        router: create_router(state),
        sessions,
        identities,
        codec,
    }
}

async fn sign_in(app: &TestApp, email: &str) -> (i64, String) {
    let outcome = app
        .sessions
        .sign_in(
            SignInSource::Email,
            &SignInProfile {
                email: email.to_string(),
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                ..SignInProfile::default()
            },
            json!({"otp_verified": true}),
        )
        .await
        .unwrap();
    (outcome.user_id, outcome.refresh_token)
}

async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    authorization: Option<String>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(AUTHORIZATION, value);
    }
    let response = router
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn fetch_access_token(app: &TestApp, refresh: &str) -> (StatusCode, Value) {
    send(
        &app.router,
        Method::GET,
        "/v1/dev/user/generate_access_token",
        Some(format!("Bearer refresh={}", refresh)),
    )
    .await
}

#[tokio::test]
async fn test_ping_requires_token() {
    let app = test_app();
    let (status, body) = send(&app.router, Method::GET, "/v1/dev/user/ping", None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["status_code"], 401000);
    assert_eq!(body["message"], "Token missing");
}

#[tokio::test]
async fn test_full_lifecycle() {
    let app = test_app();
    let (_, refresh) = sign_in(&app, "ada@example.edu").await;

    // 1. Refresh Token으로 Access Token 발급 (면제 경로)
    let (status, body) = fetch_access_token(&app, &refresh).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let access = body["data"]["access_token"].as_str().unwrap().to_string();

    // 2. 게이트 통과
    let bearer = format!("Bearer access={}&refresh={}", access, refresh);
    let (status, body) = send(&app.router, Method::GET, "/v1/prod/user/ping", Some(bearer.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["message"], "pong");

    // 3. 모든 세션 폐기
    let (status, body) = send(
        &app.router,
        Method::POST,
        "/v1/prod/user/logout_all_devices",
        Some(bearer.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["sessions_closed"], 1);

    // 4. 폐기된 Refresh Token은 재발급 불가
    let (status, body) = fetch_access_token(&app, &refresh).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status_code"], 401004);

    // 5. 이미 발급된 Access Token은 만료까지 유효
    let (status, _) = send(&app.router, Method::GET, "/v1/prod/user/ping", Some(bearer)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_generate_access_token_without_refresh() {
    let app = test_app();

    let (status, body) = send(
        &app.router,
        Method::GET,
        "/v1/dev/user/generate_access_token",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status_code"], 401003);

    let (status, body) = fetch_access_token(&app, "3f2a1e7c-0000-4000-8000-000000000000").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status_code"], 401003);
}

#[tokio::test]
async fn test_expired_access_token() {
    let app = test_app();
    let (user_id, _) = sign_in(&app, "ada@example.edu").await;
    let user = {
        use tutor_core::IdentityStore;
        app.identities.find_by_id(user_id).await.unwrap().unwrap()
    };

    let expired = app
        .codec
        .sign_at(&user.identity_claims(), Utc::now() - Duration::minutes(45))
        .unwrap();
    let (status, body) = send(
        &app.router,
        Method::GET,
        "/v1/dev/user/ping",
        Some(format!("Bearer access={}", expired)),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status_code"], 401001);
    assert_eq!(body["message"], "Token has expired");
}

#[tokio::test]
async fn test_malformed_access_token() {
    let app = test_app();
    let (status, body) = send(
        &app.router,
        Method::GET,
        "/v1/dev/user/ping",
        Some("Bearer access=eyJhbGciOiJSUzI1NiJ9.bm9wZQ.c2ln".to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status_code"], 401002);
}

#[tokio::test]
async fn test_gate_runs_before_method_check() {
    // 토큰 없이는 메서드와 무관하게 401
    let app = test_app();
    let (status, _) = send(
        &app.router,
        Method::GET,
        "/v1/dev/user/logout_all_devices",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, refresh) = sign_in(&app, "ada@example.edu").await;
    let (_, body) = fetch_access_token(&app, &refresh).await;
    let access = body["data"]["access_token"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app.router,
        Method::GET,
        "/v1/dev/user/logout_all_devices",
        Some(format!("Bearer access={}", access)),
    )
    .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_role_change_applies_after_refresh() {
    let app = test_app();
    let (user_id, refresh) = sign_in(&app, "ada@example.edu").await;

    let (_, body) = fetch_access_token(&app, &refresh).await;
    let student_access = body["data"]["access_token"].as_str().unwrap().to_string();
    let claims = app.codec.verify(&student_access).unwrap();
    assert_eq!(
        claims.identity.workspace_role.get("lobby"),
        Some(&WorkspaceRole::Student)
    );

    assert!(
        app.identities
            .set_workspace_role(user_id, "lobby", WorkspaceRole::Teacher)
            .await
    );

    // 기존 토큰은 그대로, 새 토큰에는 교사 역할 반영
    let (_, body) = fetch_access_token(&app, &refresh).await;
    let teacher_access = body["data"]["access_token"].as_str().unwrap().to_string();
    let claims = app.codec.verify(&teacher_access).unwrap();
    assert_eq!(
        claims.identity.workspace_role.get("lobby"),
        Some(&WorkspaceRole::Teacher)
    );
}

#[tokio::test]
async fn test_admin_promotion_applies_after_refresh() {
    let app = test_app();
    let (user_id, refresh) = sign_in(&app, "ada@example.edu").await;

    let (_, body) = fetch_access_token(&app, &refresh).await;
    let before = body["data"]["access_token"].as_str().unwrap().to_string();
    let claims = app.codec.verify(&before).unwrap();
    assert!(!claims.identity.system_admin);
    assert!(!derive_roles(&claims).admin);

    assert!(app.identities.set_system_admin(user_id, true).await);
    assert!(!app.identities.set_system_admin(user_id + 1000, true).await);

    // 기존 토큰의 클레임은 변하지 않음
    assert!(!app.codec.verify(&before).unwrap().identity.system_admin);

    let (status, body) = fetch_access_token(&app, &refresh).await;
    assert_eq!(status, StatusCode::OK);
    let after = body["data"]["access_token"].as_str().unwrap().to_string();
    let claims = app.codec.verify(&after).unwrap();
    assert!(claims.identity.system_admin);
    assert!(derive_roles(&claims).admin);
}

#[tokio::test]
async fn test_logout_only_affects_caller() {
    let app = test_app();
    let (_, ada_refresh) = sign_in(&app, "ada@example.edu").await;
    let (_, bob_refresh) = sign_in(&app, "bob@example.edu").await;

    let (_, body) = fetch_access_token(&app, &ada_refresh).await;
    let ada_access = body["data"]["access_token"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app.router,
        Method::POST,
        "/v1/dev/user/logout_all_devices",
        Some(format!("Bearer access={}", ada_access)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = fetch_access_token(&app, &bob_refresh).await;
    assert_eq!(status, StatusCode::OK);
}
