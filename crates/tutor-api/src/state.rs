//! 모든 핸들러에서 공유되는 애플리케이션 상태.

use std::sync::Arc;

use crate::auth::{AuthGate, SessionService};

/// 애플리케이션 공유 상태.
///
/// Axum의 State extractor를 통해 핸들러에 주입됩니다.
#[derive(Debug, Clone)]
pub struct AppState {
    /// 요청 인가 게이트
    pub gate: Arc<AuthGate>,

    /// 세션 수명 주기 서비스
    pub sessions: Arc<SessionService>,
}

impl AppState {
    pub fn new(gate: Arc<AuthGate>, sessions: Arc<SessionService>) -> Self {
        Self { gate, sessions }
    }
}
