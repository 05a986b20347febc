//! Error types for nimbus-chat

use thiserror::Error;

/// Failure of a single call to the chat backend
///
/// Every remote call can fail in one of four distinguishable ways; callers
/// turn them into user-visible text with [`ApiError::user_message`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The request never completed (connect, DNS, reset, timeout)
    #[error("network failure: {0}")]
    Network(String),

    /// Non-2xx status, with the body's `error` field when one was present
    #[error("HTTP {status}{}", .message.as_deref().map(|m| format!(": {}", m)).unwrap_or_default())]
    Http { status: u16, message: Option<String> },

    /// 2xx status whose body carries an `error` field
    #[error("application error: {0}")]
    Application(String),

    /// Body could not be read as the expected JSON
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ApiError {
    /// Text shown to the user in the conversation view
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network(reason) => format!("Request failed: {}", reason),
            ApiError::Http {
                message: Some(message),
                ..
            } => format!("Error: {}", message),
            ApiError::Http {
                status,
                message: None,
            } => format!("Error: HTTP {}", status),
            ApiError::Application(message) => format!("Error: {}", message),
            ApiError::Malformed(_) => "Invalid response from server".to_string(),
        }
    }

    /// Short reason without the user-facing prefix
    pub fn reason(&self) -> String {
        match self {
            ApiError::Network(reason) => reason.clone(),
            ApiError::Http {
                message: Some(message),
                ..
            } => message.clone(),
            ApiError::Http {
                status,
                message: None,
            } => format!("HTTP {}", status),
            ApiError::Application(message) => message.clone(),
            ApiError::Malformed(detail) => detail.clone(),
        }
    }
}

/// Result type for backend calls
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// The main error type for nimbus-chat operations
#[derive(Error, Debug)]
pub enum Error {
    /// Remote call failed
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Client-side storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// An operation needed a current session and none could be established
    #[error("No active chat session")]
    NoActiveSession,

    /// A newer operation of the same kind completed first; this result was dropped
    #[error("Superseded by a newer request")]
    Superseded,
}

/// A specialized Result type for nimbus-chat operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl Error {
    /// Text shown to the user when this error ends an operation
    pub fn user_message(&self) -> String {
        match self {
            Error::Api(api) => api.user_message(),
            other => format!("Error: {}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages_distinguish_failure_kinds() {
        assert_eq!(
            ApiError::Network("connection refused".into()).user_message(),
            "Request failed: connection refused"
        );
        assert_eq!(
            ApiError::Http {
                status: 404,
                message: Some("session not found or unauthorized".into())
            }
            .user_message(),
            "Error: session not found or unauthorized"
        );
        assert_eq!(
            ApiError::Http {
                status: 502,
                message: None
            }
            .user_message(),
            "Error: HTTP 502"
        );
        assert_eq!(
            ApiError::Application("model and message required".into()).user_message(),
            "Error: model and message required"
        );
        assert_eq!(
            ApiError::Malformed("expected value at line 1".into()).user_message(),
            "Invalid response from server"
        );
    }

    #[test]
    fn test_http_display_includes_message() {
        let err = ApiError::Http {
            status: 401,
            message: Some("unauthenticated".into()),
        };
        assert_eq!(err.to_string(), "HTTP 401: unauthenticated");
        let err = ApiError::Http {
            status: 500,
            message: None,
        };
        assert_eq!(err.to_string(), "HTTP 500");
    }

    #[test]
    fn test_error_wraps_api_error() {
        let err: Error = ApiError::Application("boom".into()).into();
        assert_eq!(err.user_message(), "Error: boom");
        assert_eq!(Error::NoActiveSession.user_message(), "Error: No active chat session");
    }
}
