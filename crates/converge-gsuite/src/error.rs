//! Error types for the Admin SDK adapter.

use converge_core::ProviderError;
use thiserror::Error;

/// Result type alias using `GsuiteError`.
pub type GsuiteResult<T> = Result<T, GsuiteError>;

/// Errors produced while talking to the Google Admin APIs.
#[derive(Debug, Error)]
pub enum GsuiteError {
    /// Client construction failed.
    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    /// The token was rejected.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The addressed resource does not exist.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Too many requests; the API asked the caller to slow down.
    #[error("Rate limited (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Any other non-success answer, with the message Google returned.
    #[error("Google API error {status}: {message}")]
    Api { status: u16, message: String },

    /// The request never got an answer.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The body did not have the expected shape.
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl GsuiteError {
    /// HTTP status carried by this error, if the API answered.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Auth(_) => Some(401),
            Self::NotFound(_) => Some(404),
            Self::RateLimited { .. } => Some(429),
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::InvalidConfig(_) | Self::ParseError(_) => None,
        }
    }
}

impl From<GsuiteError> for ProviderError {
    fn from(err: GsuiteError) -> Self {
        match err {
            GsuiteError::NotFound(message) => ProviderError::NotFound(message),
            GsuiteError::Api { status, message } => ProviderError::Api { status, message },
            GsuiteError::Auth(message) => ProviderError::Api {
                status: 401,
                message,
            },
            e @ GsuiteError::RateLimited { .. } => ProviderError::Api {
                status: 429,
                message: e.to_string(),
            },
            GsuiteError::ParseError(message) => ProviderError::InvalidResponse(message),
            e @ (GsuiteError::Http(_) | GsuiteError::InvalidConfig(_)) => {
                ProviderError::Transport(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_stays_not_found() {
        let err: ProviderError = GsuiteError::NotFound("Resource Not Found: groupKey".into()).into();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_api_error_keeps_status_and_message() {
        let err: ProviderError = GsuiteError::Api {
            status: 409,
            message: "Entity already exists.".into(),
        }
        .into();
        assert_eq!(
            err,
            ProviderError::Api {
                status: 409,
                message: "Entity already exists.".into()
            }
        );
    }

    #[test]
    fn test_rate_limit_maps_to_429() {
        let err = GsuiteError::RateLimited {
            retry_after_secs: Some(30),
        };
        assert_eq!(err.status(), Some(429));
        let mapped: ProviderError = err.into();
        assert!(matches!(mapped, ProviderError::Api { status: 429, .. }));
    }

    #[test]
    fn test_parse_error_is_invalid_response() {
        let err: ProviderError = GsuiteError::ParseError("missing id".into()).into();
        assert_eq!(err, ProviderError::InvalidResponse("missing id".into()));
    }
}
