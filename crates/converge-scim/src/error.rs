//! SCIM client error types.

use converge_core::ProviderError;
use thiserror::Error;

/// Result type alias using `ScimClientError`.
pub type ScimClientResult<T> = Result<T, ScimClientError>;

#[derive(Debug, Error)]
pub enum ScimClientError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Resource conflict: {0}")]
    Conflict(String),

    #[error("Rate limited (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Non-success answer; `detail` is the SCIM error `detail` when present.
    #[error("SCIM error {status}: {detail}")]
    ScimError { status: u16, detail: String },

    #[error("Target unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),

    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

impl From<ScimClientError> for ProviderError {
    fn from(err: ScimClientError) -> Self {
        match err {
            ScimClientError::NotFound(detail) => ProviderError::NotFound(detail),
            ScimClientError::Conflict(message) => ProviderError::Api {
                status: 409,
                message,
            },
            ScimClientError::AuthError(message) => ProviderError::Api {
                status: 401,
                message,
            },
            e @ ScimClientError::RateLimited { .. } => ProviderError::Api {
                status: 429,
                message: e.to_string(),
            },
            ScimClientError::ScimError { status, detail } => ProviderError::Api {
                status,
                message: detail,
            },
            ScimClientError::ParseError(message) => ProviderError::InvalidResponse(message),
            e @ (ScimClientError::Unreachable(_) | ScimClientError::InvalidConfig(_)) => {
                ProviderError::Transport(e.to_string())
            }
        }
    }
}
