//! 복합 Bearer 값 파싱.
//!
//! 클라이언트는 두 토큰을 하나의 헤더로 보냅니다:
//!
//! ```text
//! Authorization: Bearer access=<jwt>&refresh=<uuid>
//! ```

use axum::http::{header::AUTHORIZATION, HeaderMap};

/// Authorization 헤더에서 꺼낸 토큰 쌍.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BearerTokens {
    pub access: Option<String>,
    pub refresh: Option<String>,
}

impl BearerTokens {
    /// 헤더 맵에서 추출. 헤더가 없거나 형식이 다르면 빈 값을 반환합니다.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(Self::parse)
            .unwrap_or_default()
    }

    /// `Bearer k=v&k=v` 형식을 파싱합니다.
    ///
    /// 값은 첫 번째 `=` 이후 전체이며 공백을 제거하지 않습니다. `access`,
    /// `refresh` 외의 키와 `=`가 없는 조각은 무시합니다. 같은 키가 반복되면
    /// 마지막 조각이 이기고, 빈 값은 토큰 없음으로 취급합니다.
    pub fn parse(header: &str) -> Self {
        let Some(credentials) = header.strip_prefix("Bearer ") else {
            return Self::default();
        };

        let mut tokens = Self::default();
        for pair in credentials.split('&') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            let value = (!value.is_empty()).then(|| value.to_string());
            match key {
                "access" => tokens.access = value,
                "refresh" => tokens.refresh = value,
                _ => {}
            }
        }
        tokens
    }
}
