/*
 * Responsibility
 * - Handler-facing failure types (StatusSignal / Failure)
 * - Failure is decided at the handler boundary; the pipeline classifies it
 *   by variant, never by inspecting the error's type at runtime
 * - sqlx::Error / RepoError / anyhow::Error convert with `?`
 */
use std::sync::{Arc, Mutex};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::repos::error::RepoError;

pub type HandlerResult<T> = Result<T, Failure>;

/// A failure deliberately raised by handler logic to produce a specific
/// client-visible status. Its message is shown to the caller verbatim.
#[derive(Debug, Clone, Error)]
#[error("{status}: {message}")]
pub struct StatusSignal {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl StatusSignal {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            code: default_code(status),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    /// Replace the machine-readable code (e.g. `TOKEN_EXPIRED`).
    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = code;
        self
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
}

fn default_code(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "BAD_REQUEST",
        StatusCode::UNAUTHORIZED => "UNAUTHORIZED",
        StatusCode::FORBIDDEN => "FORBIDDEN",
        StatusCode::NOT_FOUND => "NOT_FOUND",
        StatusCode::METHOD_NOT_ALLOWED => "METHOD_NOT_ALLOWED",
        StatusCode::CONFLICT => "CONFLICT",
        StatusCode::PRECONDITION_FAILED => "PRECONDITION_FAILED",
        StatusCode::PAYLOAD_TOO_LARGE => "PAYLOAD_TOO_LARGE",
        StatusCode::UNSUPPORTED_MEDIA_TYPE => "UNSUPPORTED_MEDIA_TYPE",
        StatusCode::UNPROCESSABLE_ENTITY => "UNPROCESSABLE_ENTITY",
        StatusCode::TOO_MANY_REQUESTS => "TOO_MANY_REQUESTS",
        s if s.is_server_error() => "SERVER_ERROR",
        _ => "ERROR",
    }
}

/// Everything a handler can fail with.
#[derive(Debug, Error)]
pub enum Failure {
    #[error(transparent)]
    Status(#[from] StatusSignal),

    #[error(transparent)]
    Storage(#[from] RepoError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for Failure {
    fn from(e: sqlx::Error) -> Self {
        Self::Storage(RepoError::Db(e))
    }
}

/// Carries a handler's failure out through the response so the pipeline can
/// normalize it. Response extensions require `Clone`, hence the shared slot.
#[derive(Clone)]
pub(crate) struct EscapedFailure(Arc<Mutex<Option<Failure>>>);

impl EscapedFailure {
    fn new(failure: Failure) -> Self {
        Self(Arc::new(Mutex::new(Some(failure))))
    }

    pub(crate) fn take(&self) -> Option<Failure> {
        self.0.lock().ok().and_then(|mut slot| slot.take())
    }
}

/// The body is filled in by the pipeline. Without the pipeline installed the
/// client only sees a bare 500.
impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let mut res = StatusCode::INTERNAL_SERVER_ERROR.into_response();
        res.extensions_mut().insert(EscapedFailure::new(self));
        res
    }
}

impl IntoResponse for StatusSignal {
    fn into_response(self) -> Response {
        Failure::Status(self).into_response()
    }
}
