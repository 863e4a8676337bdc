//! HTTP error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use playtogether_core::error::{ClassifiedError, PlayTogetherError};
use playtogether_core::messages::ErrorBody;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed input; answered before any upstream call
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// Upstream failure, already classified
    #[error("{0}")]
    Steam(#[from] ClassifiedError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Steam(e) => {
                StatusCode::from_u16(e.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            ApiError::Steam(e) => e.to_body(),
            other => ErrorBody {
                error: other.to_string(),
                retry_after: None,
            },
        }
    }
}

impl From<PlayTogetherError> for ApiError {
    fn from(e: PlayTogetherError) -> Self {
        match e {
            PlayTogetherError::Steam(classified) => ApiError::Steam(classified),
            PlayTogetherError::InvalidInput(msg) | PlayTogetherError::Precondition(msg) => {
                ApiError::BadRequest(msg)
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(msg) = &self {
            tracing::error!(error = %msg, "Internal error");
        }
        (self.status(), Json(self.body())).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
