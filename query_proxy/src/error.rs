//! Proxy error type and its JSON rendering.

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use state_store_interface::StateStoreError;

/// Why a proxied request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProxyErrorKind {
    /// The log backend could not be reached (connect error, timeout).
    UpstreamUnreachable,
    /// The log backend answered with a non-success status.
    UpstreamBadStatus,
    /// The log backend's body could not be decoded.
    DecodeError,
    /// The dashboard sent invalid parameters.
    BadRequest,
    /// The persisted state could not be read.
    Internal,
}

impl ProxyErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyErrorKind::UpstreamUnreachable => "upstream_unreachable",
            ProxyErrorKind::UpstreamBadStatus => "upstream_bad_status",
            ProxyErrorKind::DecodeError => "decode_error",
            ProxyErrorKind::BadRequest => "bad_request",
            ProxyErrorKind::Internal => "internal",
        }
    }

    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            ProxyErrorKind::UpstreamUnreachable
                | ProxyErrorKind::UpstreamBadStatus
                | ProxyErrorKind::DecodeError
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyErrorKind::UpstreamUnreachable
            | ProxyErrorKind::UpstreamBadStatus
            | ProxyErrorKind::DecodeError => StatusCode::BAD_GATEWAY,
            ProxyErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ProxyErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ProxyErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct ProxyError {
    pub kind: ProxyErrorKind,
    pub message: String,
}

pub type ProxyResult<T> = Result<T, ProxyError>;

impl ProxyError {
    pub fn new(kind: ProxyErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::new(ProxyErrorKind::UpstreamUnreachable, message)
    }

    pub fn bad_status(status: StatusCode, body: &str) -> Self {
        let body = body.trim();
        let message = if body.is_empty() {
            format!("log backend returned {}", status)
        } else {
            format!("log backend returned {}: {}", status, body)
        };
        Self::new(ProxyErrorKind::UpstreamBadStatus, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ProxyErrorKind::DecodeError, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ProxyErrorKind::BadRequest, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ProxyErrorKind::Internal, message)
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProxyError::decode(err.to_string())
        } else {
            ProxyError::unreachable(err.to_string())
        }
    }
}

impl From<StateStoreError> for ProxyError {
    fn from(err: StateStoreError) -> Self {
        ProxyError::internal(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    kind: ProxyErrorKind,
    message: &'a str,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        if self.kind.is_upstream() {
            warn!("Log backend call failed: {}", self);
            observability::record_upstream_error(self.kind.as_str());
        }

        let body = ErrorBody {
            error: ErrorDetail {
                kind: self.kind,
                message: &self.message,
            },
        };
        (self.kind.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn test_status_codes() {
        assert_eq!(ProxyError::unreachable("x").kind.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            ProxyError::bad_status(StatusCode::INTERNAL_SERVER_ERROR, "").kind.status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(ProxyError::decode("x").kind.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(ProxyError::bad_request("x").kind.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_bad_status_message_includes_body() {
        let err = ProxyError::bad_status(StatusCode::BAD_REQUEST, "parse error at line 1\n");
        assert_eq!(err.message, "log backend returned 400 Bad Request: parse error at line 1");
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let response = ProxyError::unreachable("connection refused").into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["kind"], "upstream_unreachable");
        assert_eq!(body["error"]["message"], "connection refused");
    }
}
