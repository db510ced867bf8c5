//! Request authentication.
//!
//! An `Authenticator` turns request headers into a `Principal` or leaves the
//! request anonymous. It never fails past its own boundary: a token problem is
//! either swallowed (anonymous) or turned into a 401 `StatusSignal`, depending
//! on the configured `TokenFailurePolicy`.

use std::str::FromStr;

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderName};

use crate::error::StatusSignal;
use crate::services::auth::principal::Principal;
use crate::services::auth::token_codec::{TokenCodec, TokenError};

/// Header carrying the identity token unless configured otherwise.
pub const DEFAULT_TOKEN_HEADER: &str = "x-jwt-token";

/// Async so that implementations may consult an external identity provider.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// - `Ok(Some(_))`: identity established
    /// - `Ok(None)`: anonymous
    /// - `Err(_)`: the deployment chose to reject this request outright
    async fn authenticate(
        &self,
        headers: &HeaderMap,
    ) -> Result<Option<Principal>, StatusSignal>;
}

/// What to do with a request whose token could not be accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenFailurePolicy {
    /// Continue the request without an identity.
    #[default]
    Anonymous,
    /// Answer 401 without dispatching.
    Reject,
}

impl FromStr for TokenFailurePolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anonymous" | "lenient" => Ok(Self::Anonymous),
            "reject" | "strict" => Ok(Self::Reject),
            _ => Err(()),
        }
    }
}

/// Never establishes an identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousAuthenticator;

#[async_trait]
impl Authenticator for AnonymousAuthenticator {
    async fn authenticate(
        &self,
        _headers: &HeaderMap,
    ) -> Result<Option<Principal>, StatusSignal> {
        Ok(None)
    }
}

/// Reads a signed token from a request header and verifies it with `TokenCodec`.
#[derive(Debug, Clone)]
pub struct JwtAuthenticator {
    codec: TokenCodec,
    header: HeaderName,
    on_expired: TokenFailurePolicy,
    on_invalid: TokenFailurePolicy,
}

impl JwtAuthenticator {
    pub fn new(codec: TokenCodec) -> Self {
        Self {
            codec,
            header: HeaderName::from_static(DEFAULT_TOKEN_HEADER),
            on_expired: TokenFailurePolicy::Anonymous,
            on_invalid: TokenFailurePolicy::Anonymous,
        }
    }

    pub fn with_header(mut self, header: HeaderName) -> Self {
        self.header = header;
        self
    }

    pub fn on_expired(mut self, policy: TokenFailurePolicy) -> Self {
        self.on_expired = policy;
        self
    }

    pub fn on_invalid(mut self, policy: TokenFailurePolicy) -> Self {
        self.on_invalid = policy;
        self
    }

    pub fn header(&self) -> &HeaderName {
        &self.header
    }

    fn token_failed(&self, err: TokenError) -> Result<Option<Principal>, StatusSignal> {
        let policy = match &err {
            TokenError::Expired => {
                tracing::info!(header = %self.header, "identity token expired");
                self.on_expired
            }
            TokenError::InvalidSignature => {
                tracing::warn!(
                    header = %self.header,
                    error = %err,
                    "identity token signature mismatch, possible tampering"
                );
                self.on_invalid
            }
            TokenError::Malformed(_) | TokenError::Signing(_) => {
                tracing::warn!(header = %self.header, error = %err, "malformed identity token");
                self.on_invalid
            }
        };

        match (policy, err) {
            (TokenFailurePolicy::Anonymous, _) => Ok(None),
            (TokenFailurePolicy::Reject, TokenError::Expired) => {
                Err(StatusSignal::unauthorized("token expired").with_code("TOKEN_EXPIRED"))
            }
            (TokenFailurePolicy::Reject, _) => {
                Err(StatusSignal::unauthorized("invalid token").with_code("INVALID_TOKEN"))
            }
        }
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    async fn authenticate(
        &self,
        headers: &HeaderMap,
    ) -> Result<Option<Principal>, StatusSignal> {
        let Some(raw) = headers.get(&self.header) else {
            tracing::debug!(header = %self.header, "no identity token, anonymous request");
            return Ok(None);
        };

        let token = match raw.to_str() {
            Ok(v) => v.trim(),
            Err(_) => {
                return self.token_failed(TokenError::Malformed(
                    "header value is not visible ASCII".to_string(),
                ));
            }
        };
        let token = token.strip_prefix("Bearer ").unwrap_or(token);

        match self.codec.decode(token) {
            Ok(principal) => {
                tracing::debug!(subject = %principal.subject(), "identity established");
                Ok(Some(principal))
            }
            Err(err) => self.token_failed(err),
        }
    }
}
