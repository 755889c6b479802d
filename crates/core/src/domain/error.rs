use serde::Serialize;

/// アプリケーション共通エラーコード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    #[serde(rename = "E_INVALID_STATE")]
    InvalidState,
    #[serde(rename = "E_VALIDATION")]
    Validation,
    #[serde(rename = "E_CONFIG")]
    Config,
    #[serde(rename = "E_IO")]
    Io,
    #[serde(rename = "E_INTERNAL")]
    Internal,
}

/// アプリケーションエラー（UI ペイロード兼用）
#[derive(Debug, Clone, Serialize)]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    pub recoverable: bool,
}

impl AppError {
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::InvalidState,
            message: msg.into(),
            recoverable: true,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Validation,
            message: msg.into(),
            recoverable: true,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Config,
            message: msg.into(),
            recoverable: false,
        }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Io,
            message: msg.into(),
            recoverable: true,
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Internal,
            message: msg.into(),
            recoverable: false,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}
