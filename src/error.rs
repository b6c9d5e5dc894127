// API error types shared by every service client

use serde_json::Value;
use thiserror::Error;

// ============================================================================
// ERROR CLASS
// ============================================================================

/// Coarse classification of a non-success HTTP status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    BadRequest,
    Forbidden,
    NotFound,
    PayloadTooLarge,
    RateLimited,
    Server,
    Other,
}

impl ErrorClass {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => ErrorClass::BadRequest,
            401 | 403 => ErrorClass::Forbidden,
            404 => ErrorClass::NotFound,
            413 => ErrorClass::PayloadTooLarge,
            429 => ErrorClass::RateLimited,
            s if s >= 500 => ErrorClass::Server,
            _ => ErrorClass::Other,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ErrorClass::BadRequest => "bad request",
            ErrorClass::Forbidden => "forbidden",
            ErrorClass::NotFound => "not found",
            ErrorClass::PayloadTooLarge => "payload too large",
            ErrorClass::RateLimited => "rate limited",
            ErrorClass::Server => "server error",
            ErrorClass::Other => "http error",
        }
    }
}

// ============================================================================
// API ERROR
// ============================================================================

#[derive(Debug, Error)]
pub enum ApiError {
    /// Server answered with a non-success status (after retries)
    #[error("{message}")]
    Status {
        service: &'static str,
        status: u16,
        class: ErrorClass,
        message: String,
        body: Option<Value>,
    },

    #[error("[{service}] request to {url} failed: {source}")]
    Transport {
        service: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{0}")]
    Decode(String),

    #[error("missing credential: {0}")]
    MissingCredential(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("http client setup failed: {0}")]
    Setup(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// HTTP status if the error came from a server response
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn class(&self) -> Option<ErrorClass> {
        match self {
            ApiError::Status { class, .. } => Some(*class),
            _ => None,
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        ApiError::InvalidArgument(msg.into())
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Truncate a response body for error messages
pub fn snippet(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_class_from_status() {
        assert_eq!(ErrorClass::from_status(400), ErrorClass::BadRequest);
        assert_eq!(ErrorClass::from_status(403), ErrorClass::Forbidden);
        assert_eq!(ErrorClass::from_status(404), ErrorClass::NotFound);
        assert_eq!(ErrorClass::from_status(413), ErrorClass::PayloadTooLarge);
        assert_eq!(ErrorClass::from_status(429), ErrorClass::RateLimited);
        assert_eq!(ErrorClass::from_status(503), ErrorClass::Server);
        assert_eq!(ErrorClass::from_status(418), ErrorClass::Other);
    }

    #[test]
    fn test_snippet_truncates_with_ellipsis() {
        assert_eq!(snippet("short", 10), "short");
        let long = "x".repeat(20);
        let cut = snippet(&long, 5);
        assert_eq!(cut, "xxxxx…");
    }

    #[test]
    fn test_status_accessors() {
        let err = ApiError::Status {
            service: "test",
            status: 404,
            class: ErrorClass::NotFound,
            message: "HTTP 404".into(),
            body: None,
        };
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.class(), Some(ErrorClass::NotFound));
        assert_eq!(err.to_string(), "HTTP 404");
        assert!(ApiError::invalid("x").status().is_none());
    }
}
