//! 요청 인가 게이트.
//!
//! 모든 요청은 핸들러에 도달하기 전에 다음 순서로 판정됩니다:
//!
//! 1. 버전/환경 접두사를 제거해 논리 경로를 구함
//! 2. 면제 경로이면 통과
//! 3. Bearer 값에서 Access Token 추출 후 검증
//! 4. 클레임에서 역할 도출
//! 5. 정책 테이블 매칭
//!
//! 어느 단계에서든 판단할 수 없으면 거부합니다.

use std::sync::Arc;

use axum::http::HeaderMap;
use tracing::{debug, info, warn};
use tutor_core::{
    derive_roles, logical_path, AccessClaims, AccessConfig, AccessPolicy, PolicyDecision,
    PolicyError, PublicRoutes,
};

use super::bearer::BearerTokens;
use super::error::AuthError;
use super::jwt::TokenCodec;
use crate::metrics::record_auth_decision;

/// 게이트 판정 결과.
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// 인증 없이 통과
    Exempt,
    /// 검증 및 정책 통과
    Authorized(AccessClaims),
}

/// 인가 게이트.
///
/// 모든 필드는 시작 시 구성되며 요청 간에 공유되는 불변 상태입니다.
#[derive(Debug)]
pub struct AuthGate {
    codec: Arc<TokenCodec>,
    policy: AccessPolicy,
    public: PublicRoutes,
    prefix_depth: usize,
}

impl AuthGate {
    pub fn new(
        codec: Arc<TokenCodec>,
        policy: AccessPolicy,
        public: PublicRoutes,
        prefix_depth: usize,
    ) -> Self {
        Self {
            codec,
            policy,
            public,
            prefix_depth,
        }
    }

    /// 접근 설정으로부터 게이트 생성.
    pub fn from_config(codec: Arc<TokenCodec>, access: &AccessConfig) -> Result<Self, PolicyError> {
        Ok(Self::new(
            codec,
            access.build_policy()?,
            access.public_routes()?,
            access.prefix_depth,
        ))
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// 요청 경로의 논리 경로.
    pub fn logical_path(&self, path: &str) -> String {
        logical_path(path, self.prefix_depth)
    }

    /// 요청 판정.
    pub fn admit(&self, path: &str, headers: &HeaderMap) -> Result<Admission, AuthError> {
        let logical = self.logical_path(path);

        if self.public.is_public(&logical) {
            debug!(path = %logical, "면제 경로 통과");
            record_auth_decision("exempt");
            return Ok(Admission::Exempt);
        }

        let result = self.authorize(&logical, headers);
        match &result {
            Ok(Admission::Authorized(claims)) => {
                debug!(user_id = claims.user_id(), path = %logical, "요청 허용");
                record_auth_decision("allowed");
            }
            Ok(Admission::Exempt) => {}
            Err(err) => record_auth_decision(err.outcome()),
        }
        result
    }

    fn authorize(&self, logical: &str, headers: &HeaderMap) -> Result<Admission, AuthError> {
        let Some(access) = BearerTokens::from_headers(headers).access else {
            info!(path = %logical, reason = %AuthError::TokenMissing, "Access Token 검증 실패");
            return Err(AuthError::TokenMissing);
        };

        let claims = self.codec.verify(&access).map_err(|e| {
            info!(path = %logical, reason = %e, "Access Token 검증 실패");
            AuthError::from(e)
        })?;

        let roles = derive_roles(&claims);
        match self.policy.decide(&roles, logical) {
            PolicyDecision::Allow => Ok(Admission::Authorized(claims)),
            PolicyDecision::Denied => {
                warn!(
                    user_id = claims.user_id(),
                    path = %logical,
                    roles = ?roles.roles(),
                    unmatched = false,
                    "역할 부족으로 접근 거부"
                );
                Err(AuthError::PolicyDenied)
            }
            PolicyDecision::Unmatched => {
                warn!(
                    user_id = claims.user_id(),
                    path = %logical,
                    unmatched = true,
                    "정책에 없는 경로 접근 거부"
                );
                Err(AuthError::PathUnmatched)
            }
        }
    }
}
