use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    NotFound,
    Validation,
    RateLimited,
    Internal,
}

/// Error body returned by the catalog and auth services on non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// A lot key or pagination cursor that cannot be used as an integer.
///
/// This is an invariant violation rather than a user error: callers are
/// expected to surface it loudly instead of resetting the cursor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CursorParseError {
    #[error("lot key {0:?} is not an integer")]
    NotNumeric(String),
    #[error("cursor {0} cannot be advanced without overflow")]
    Overflow(i64),
}
