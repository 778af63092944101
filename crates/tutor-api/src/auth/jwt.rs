//! Access Token 서명/검증.
//!
//! RS256 비대칭 서명을 사용합니다. 키 쌍은 시작 시 한 번 로드되는 불변 설정이며,
//! 잘못된 키는 요청 단위 실패가 아니라 시작 실패로 처리됩니다.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::ExposeSecret;
use tutor_core::{AccessClaims, AuthConfig, IdentityClaims, WorkspaceMembership};

/// 토큰 검증 실패.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// 토큰이 비어 있음
    #[error("Token missing")]
    Missing,
    /// 서명은 유효하나 `now > exp`
    #[error("Token has expired")]
    Expired,
    /// 서명 불일치 또는 구조 손상
    #[error("Invalid token")]
    Malformed,
}

/// 키 로드 에러 (시작 시 치명적).
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("개인키 로드 실패: {0}")]
    InvalidPrivateKey(#[source] jsonwebtoken::errors::Error),
    #[error("공개키 로드 실패: {0}")]
    InvalidPublicKey(#[source] jsonwebtoken::errors::Error),
    #[error("개인키와 공개키가 짝이 맞지 않습니다: {0}")]
    KeyPairMismatch(TokenError),
}

/// Access Token 코덱.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &Algorithm::RS256)
            .field("access_ttl", &self.access_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// PEM 키 쌍으로 코덱 생성.
    ///
    /// 생성 직후 시험 토큰을 서명/검증하여 두 키가 같은 쌍인지 확인합니다.
    ///
    /// # Errors
    ///
    /// - `KeyError::InvalidPrivateKey`: 개인키 PEM 파싱 또는 서명 실패
    /// - `KeyError::InvalidPublicKey`: 공개키 PEM 파싱 실패
    /// - `KeyError::KeyPairMismatch`: 서명한 토큰을 공개키로 검증할 수 없음
    pub fn from_pem(
        private_pem: &[u8],
        public_pem: &[u8],
        access_ttl: Duration,
    ) -> Result<Self, KeyError> {
        let encoding_key =
            EncodingKey::from_rsa_pem(private_pem).map_err(KeyError::InvalidPrivateKey)?;
        let decoding_key =
            DecodingKey::from_rsa_pem(public_pem).map_err(KeyError::InvalidPublicKey)?;

        // 만료는 엄격하게 판정 (clock skew 보정 없음)
        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = 0;
        validation.validate_exp = true;

        let codec = Self {
            encoding_key,
            decoding_key,
            validation,
            access_ttl,
        };
        codec.self_check()?;
        Ok(codec)
    }

    /// 애플리케이션 설정에서 코덱 생성.
    pub fn from_config(config: &AuthConfig) -> Result<Self, KeyError> {
        let private_pem = config.private_key_pem();
        Self::from_pem(
            private_pem.expose_secret().as_bytes(),
            config.public_key_pem().as_bytes(),
            Duration::minutes(config.access_token_ttl_minutes),
        )
    }

    fn self_check(&self) -> Result<(), KeyError> {
        let sample = IdentityClaims {
            user_id: 0,
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            system_admin: false,
            workspace_role: WorkspaceMembership::new(),
            student_id: String::new(),
            profile_img_url: String::new(),
        };
        let token = self.sign(&sample).map_err(KeyError::InvalidPrivateKey)?;
        self.verify(&token)
            .map(|_| ())
            .map_err(KeyError::KeyPairMismatch)
    }

    /// 현재 시각 기준으로 서명.
    ///
    /// `iat = now`, `exp = now + access_ttl`.
    pub fn sign(&self, identity: &IdentityClaims) -> Result<String, jsonwebtoken::errors::Error> {
        self.sign_at(identity, Utc::now())
    }

    /// 지정한 발급 시각으로 서명.
    pub fn sign_at(
        &self,
        identity: &IdentityClaims,
        issued_at: DateTime<Utc>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = AccessClaims::issue(identity.clone(), issued_at, self.access_ttl);
        encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
    }

    /// 서명과 만료를 검증하고 클레임을 반환합니다.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, TokenError> {
        if token.is_empty() {
            return Err(TokenError::Missing);
        }

        decode::<AccessClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }
}
