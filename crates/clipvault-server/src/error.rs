//! Mapping of library errors onto HTTP responses.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use clipvault::{AdmissionError, ClipvaultError, QuotaError, WorkerError};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_input", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<AdmissionError> for ApiError {
    fn from(err: AdmissionError) -> Self {
        let message = err.to_string();
        match err {
            AdmissionError::InvalidTitle(_) | AdmissionError::UnsupportedFormat(_) => {
                Self::bad_request(message)
            }
            AdmissionError::TooLarge { .. } => {
                Self::new(StatusCode::PAYLOAD_TOO_LARGE, "too_large", message)
            }
            AdmissionError::Quota(QuotaError::InsufficientSpace { .. }) => {
                Self::new(StatusCode::INSUFFICIENT_STORAGE, "insufficient_space", message)
            }
            AdmissionError::Worker(WorkerError::ChannelClosed | WorkerError::QueueFull) => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, "unavailable", message)
            }
            _ => Self::internal(message),
        }
    }
}

impl From<ClipvaultError> for ApiError {
    fn from(err: ClipvaultError) -> Self {
        match err {
            ClipvaultError::NotFound(id) => Self::not_found(format!("No media with id {}", id)),
            ClipvaultError::Admission(e) => e.into(),
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::new(err.status(), "invalid_upload", err.body_text())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(format!("I/O error: {}", err))
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::internal(format!("Background task failed: {}", err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.message, "Request failed");
        } else {
            tracing::debug!(status = %self.status, error = %self.message, "Request rejected");
        }

        let body = Json(ErrorResponse {
            error: self.message,
            code: self.code,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admission_status_mapping() {
        let cases = [
            (
                AdmissionError::InvalidTitle("empty".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                AdmissionError::UnsupportedFormat("avi".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                AdmissionError::TooLarge { size: 2, max: 1 },
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (
                AdmissionError::Quota(QuotaError::InsufficientSpace {
                    required: 10,
                    freed: 0,
                    shortfall: 10,
                }),
                StatusCode::INSUFFICIENT_STORAGE,
            ),
            (
                AdmissionError::Worker(WorkerError::ChannelClosed),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                AdmissionError::Worker(WorkerError::SpawnFailed("x".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[test]
    fn test_not_found_mapping() {
        let err = ApiError::from(ClipvaultError::NotFound("abc".to_string()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
