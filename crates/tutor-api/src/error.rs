//! API 응답 봉투.
//!
//! 모든 엔드포인트가 같은 형태로 응답합니다. 기존 클라이언트가 `status_code`로
//! 분기하므로 필드 이름과 숫자 코드는 변경하지 않습니다.
//!
//! ```json
//! {
//!   "success": false,
//!   "message": "Token has expired",
//!   "status_code": 401001
//! }
//! ```

use serde::{Deserialize, Serialize};

/// 통합 API 응답.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    /// 세분화된 결과 코드 (성공 시 200)
    pub status_code: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// 성공 응답.
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            status_code: 200,
            data: Some(data),
        }
    }

    /// 실패 응답.
    pub fn failure(message: impl Into<String>, status_code: u32) -> Self {
        Self {
            success: false,
            message: message.into(),
            status_code,
            data: None,
        }
    }
}
