//! 설정 관리.
//!
//! 파일(TOML)과 `TUTOR__` 접두사 환경 변수에서 애플리케이션 설정을 로드합니다.
//! 키 쌍, 면제 경로, 접근 정책 테이블은 시작 시 한 번 읽히며 런타임에 변경되지 않습니다.

use std::path::Path;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

use crate::domain::{AccessPolicy, PolicyError, PolicyRule, PublicRoutes, Role};

/// 애플리케이션 설정.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
    pub access: AccessConfig,
}

/// 서버 설정.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 요청 처리 제한 시간 (초)
    pub request_timeout_secs: u64,
    /// CORS 허용 origin 목록
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            request_timeout_secs: 30,
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
            ],
        }
    }
}

/// 데이터베이스 설정.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL 접속 URL. 없으면 메모리 저장소로 동작
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout_secs: u64,
    /// 시작 시 마이그레이션 실행 여부
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            connection_timeout_secs: 30,
            run_migrations: true,
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// 토큰 설정.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// RS256 서명용 개인키 (PEM)
    #[serde(deserialize_with = "deserialize_secret")]
    pub private_key: SecretString,
    /// RS256 검증용 공개키 (PEM)
    pub public_key: String,
    /// Access Token 유효 기간 (분)
    pub access_token_ttl_minutes: i64,
    /// Refresh Token 유효 기간 (일)
    pub refresh_token_ttl_days: i64,
    /// 저장소 호출 제한 시간 (밀리초)
    pub store_timeout_ms: u64,
    /// 신규 사용자가 학생으로 등록될 워크스페이스
    pub default_workspace: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            private_key: empty_secret(),
            public_key: String::new(),
            access_token_ttl_minutes: 30,
            refresh_token_ttl_days: 30,
            store_timeout_ms: 3_000,
            default_workspace: None,
        }
    }
}

impl AuthConfig {
    /// 정규화된 개인키 PEM.
    pub fn private_key_pem(&self) -> SecretString {
        let pem = normalize_pem(self.private_key.expose_secret());
        SecretString::new(pem.into_boxed_str())
    }

    /// 정규화된 공개키 PEM.
    pub fn public_key_pem(&self) -> String {
        normalize_pem(&self.public_key)
    }
}

/// 한 줄로 전달된 PEM의 `!`를 줄바꿈으로 복원합니다.
///
/// 배포 환경 변수에는 줄바꿈 대신 `!`를 넣는 관례를 따릅니다.
/// `!`는 base64 본문에 나타나지 않으므로 일반 PEM은 그대로 유지됩니다.
pub fn normalize_pem(raw: &str) -> String {
    raw.trim().replace('!', "\n")
}

fn empty_secret() -> SecretString {
    SecretString::new(String::new().into_boxed_str())
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(SecretString::new(raw.into_boxed_str()))
}

/// 접근 제어 설정.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// 제거할 버전/환경 접두사 조각 수
    pub prefix_depth: usize,
    /// 인증 없이 통과하는 논리 경로
    pub exempt_paths: Vec<String>,
    /// 인증 없이 통과하는 경로 패턴
    pub public_patterns: Vec<String>,
    /// 선언 순서가 유지되는 정책 테이블
    pub policy: Vec<PolicyRule>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            prefix_depth: 4,
            exempt_paths: [
                "/",
                "/generate_access_token",
                "/get_google_signin_url",
                "/google_signin_callback",
                "/cwru_sso_callback",
                "/email/get_email_otp",
                "/email/email_signin",
                "/docs",
                "/redoc",
                "/openapi.json",
            ]
            .iter()
            .map(|p| p.to_string())
            .collect(),
            public_patterns: vec!["/agent/get/{agent_id}".to_string()],
            policy: builtin_policy(),
        }
    }
}

impl AccessConfig {
    pub fn build_policy(&self) -> Result<AccessPolicy, PolicyError> {
        AccessPolicy::new(&self.policy)
    }

    pub fn public_routes(&self) -> Result<PublicRoutes, PolicyError> {
        PublicRoutes::new(&self.exempt_paths, &self.public_patterns)
    }
}

/// 플랫폼 엔드포인트 기본 정책 테이블.
pub fn builtin_policy() -> Vec<PolicyRule> {
    use Role::{Admin, Student, Teacher};

    let staff: &[Role] = &[Teacher, Admin];
    let everyone: &[Role] = &[Student, Teacher, Admin];

    vec![
        PolicyRule::new("/agents/add_agent", staff),
        PolicyRule::new("/agents/delete_agent", staff),
        PolicyRule::new("/agents/update_agent", staff),
        PolicyRule::new("/agents/agent/{agent_id}", staff),
        PolicyRule::new("/agents/agents", everyone),
        PolicyRule::new("/upload_file", staff),
        PolicyRule::new("/agent/get/{agent_id}", everyone),
        PolicyRule::new("/threads/new_thread", everyone),
        PolicyRule::new("/threads/get_thread/{thread_id}", everyone),
        PolicyRule::new("/threads/get_thread_list", everyone),
        PolicyRule::new("/stream_chat", everyone),
        PolicyRule::new("/get_tts_file", everyone),
        PolicyRule::new("/get_temp_stt_auth_code", everyone),
        PolicyRule::new("/access/get_user_list", staff),
        PolicyRule::new("/access/grant_access", staff),
        PolicyRule::new("/ping", everyone),
        PolicyRule::new("/workspace/create", staff),
        PolicyRule::new("/workspace/add_authorized_users", staff),
        PolicyRule::new("/workspace/join", everyone),
        PolicyRule::new("/workspace/list_users", staff),
        PolicyRule::new("/workspace/delete_user", staff),
        PolicyRule::new("/logout_all_devices", everyone),
    ]
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// 파일이 없으면 기본값과 환경 변수만 사용합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix("TUTOR")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> Result<Self, config::ConfigError> {
        Self::load("config/default.toml")
    }

    /// TOML 문자열에서 설정을 로드합니다.
    pub fn from_toml(source: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
