//! Failure → `ErrorRecord` classification.
//!
//! Ordered, first match wins:
//! 1. `Failure::Status`   handler-chosen status, passed through with its message
//! 2. `Failure::Storage`  `StorageError`, generic message, cause logged
//! 3. `Failure::Internal` `InternalError`, generic message, cause + backtrace logged
//!
//! Only (1) may put handler text in front of the client.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::{Failure, StatusSignal};

pub const STORAGE_ERROR_MESSAGE: &str = "data error";
pub const INTERNAL_ERROR_MESSAGE: &str = "internal server error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    StatusSignal,
    StorageError,
    InternalError,
}

type Cause = Arc<dyn StdError + Send + Sync + 'static>;

/// A classified failure, safe to show to the client. `cause` is for the
/// server side only and is never serialized.
#[derive(Clone)]
pub struct ErrorRecord {
    kind: ErrorKind,
    status: StatusCode,
    code: &'static str,
    message: String,
    cause: Option<Cause>,
}

impl fmt::Debug for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorRecord")
            .field("kind", &self.kind)
            .field("status", &self.status)
            .field("code", &self.code)
            .field("message", &self.message)
            .field("has_cause", &self.cause.is_some())
            .finish()
    }
}

impl ErrorRecord {
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_deref()
    }
}

impl From<StatusSignal> for ErrorRecord {
    fn from(signal: StatusSignal) -> Self {
        Self {
            kind: ErrorKind::StatusSignal,
            status: signal.status(),
            code: signal.code(),
            message: signal.message().to_string(),
            cause: None,
        }
    }
}

/// Total over `Failure`: never fails, never panics.
pub fn normalize(failure: Failure) -> ErrorRecord {
    match failure {
        Failure::Status(signal) => {
            tracing::debug!(status = %signal.status(), code = signal.code(), "status signal");
            ErrorRecord::from(signal)
        }
        Failure::Storage(err) => {
            tracing::error!(error = %err, detail = ?err, "storage failure");
            ErrorRecord {
                kind: ErrorKind::StorageError,
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "STORAGE_ERROR",
                message: STORAGE_ERROR_MESSAGE.to_string(),
                cause: Some(Arc::new(err)),
            }
        }
        Failure::Internal(err) => {
            tracing::error!(
                error = %format!("{err:#}"),
                backtrace = %err.backtrace(),
                "internal server error"
            );
            let cause: Box<dyn StdError + Send + Sync + 'static> = err.into();
            ErrorRecord {
                kind: ErrorKind::InternalError,
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "INTERNAL_SERVER_ERROR",
                message: INTERNAL_ERROR_MESSAGE.to_string(),
                cause: Some(Arc::from(cause)),
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse<'a> {
    pub error: ErrorBody<'a>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub code: &'static str,
    pub message: &'a str,
}

impl IntoResponse for ErrorRecord {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code,
                message: &self.message,
            },
        };

        (self.status, Json(body)).into_response()
    }
}
