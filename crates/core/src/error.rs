//! Error types for Steam Play Together

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::messages::ErrorBody;

/// Classified failure kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    RateLimited,
    Unauthorized,
    Forbidden,
    NotFound,
    UpstreamError,
    UpstreamUnavailable,
    NetworkError,
    Unknown,
    /// Some friends were excluded from a resolve; the operation itself succeeded
    PartialFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::UpstreamError => "upstream_error",
            ErrorKind::UpstreamUnavailable => "upstream_unavailable",
            ErrorKind::NetworkError => "network_error",
            ErrorKind::Unknown => "unknown",
            ErrorKind::PartialFailure => "partial_failure",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure after classification: what happened, what to tell the user,
/// and how long to back off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    /// Diagnostic message for logs
    pub message: String,
    pub user_message: String,
    /// HTTP status the proxy answers with
    pub status_code: u16,
    pub retry_after_seconds: Option<u64>,
}

impl ClassifiedError {
    pub fn is_rate_limited(&self) -> bool {
        self.kind == ErrorKind::RateLimited
    }

    /// User message plus a wait hint when Steam asked us to back off
    pub fn toast_message(&self) -> String {
        match self.retry_after_seconds {
            Some(seconds) => format!(
                "{} Please wait {} before trying again.",
                self.user_message,
                format_wait(seconds)
            ),
            None => self.user_message.clone(),
        }
    }

    /// Body the proxy sends back for this failure
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.user_message.clone(),
            retry_after: self.retry_after_seconds,
        }
    }

    /// Rebuild a classified error on the client side from a proxy error response
    pub fn from_proxy_response(status: u16, body: ErrorBody) -> Self {
        let mut classified = crate::classify::classify(&crate::classify::RawFailure {
            status: Some(status),
            message: Some(body.error.clone()),
            ..Default::default()
        });
        classified.user_message = body.error;
        if body.retry_after.is_some() {
            classified.retry_after_seconds = body.retry_after;
        }
        classified
    }
}

impl std::fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.user_message)
    }
}

impl std::error::Error for ClassifiedError {}

/// "1 minute" / "5 minutes", rounded up
pub fn format_wait(seconds: u64) -> String {
    let minutes = seconds.div_ceil(60).max(1);
    if minutes == 1 {
        "1 minute".to_string()
    } else {
        format!("{} minutes", minutes)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlayTogetherError {
    #[error("{0}")]
    Steam(ClassifiedError),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Precondition(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl PlayTogetherError {
    pub fn classified(&self) -> Option<&ClassifiedError> {
        match self {
            PlayTogetherError::Steam(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.classified().is_some_and(ClassifiedError::is_rate_limited)
    }

    /// Message suitable for a toast, including the wait hint for rate limits
    pub fn toast_message(&self) -> String {
        match self {
            PlayTogetherError::Steam(e) => e.toast_message(),
            other => other.to_string(),
        }
    }
}

impl From<ClassifiedError> for PlayTogetherError {
    fn from(e: ClassifiedError) -> Self {
        PlayTogetherError::Steam(e)
    }
}

impl From<serde_json::Error> for PlayTogetherError {
    fn from(e: serde_json::Error) -> Self {
        PlayTogetherError::InvalidData(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PlayTogetherError>;
