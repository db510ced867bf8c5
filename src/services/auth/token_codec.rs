//! Signed identity token codec (HS256 JWT).
//!
//! `decode_at` is a pure function of (token, now, key): no state, no side effects,
//! safe to share across requests.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::services::auth::principal::Principal;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("token signature verification failed")]
    InvalidSignature,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            JwtErrorKind::InvalidSignature => Self::InvalidSignature,
            JwtErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::Malformed(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct TokenClaims {
    sub: String,
    iat: i64,
    exp: i64,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

#[derive(Serialize)]
struct TokenClaimsRef<'a> {
    sub: &'a str,
    iat: i64,
    exp: i64,
    #[serde(flatten)]
    extra: &'a BTreeMap<String, Value>,
}

/// Key material is intentionally not printable via Debug.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    leeway_seconds: i64,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("validation", &self.validation)
            .field("leeway_seconds", &self.leeway_seconds)
            .finish()
    }
}

impl TokenCodec {
    pub fn new(secret: &[u8], leeway_seconds: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked in `decode_at` so that "now" can be supplied by the caller.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.required_spec_claims =
            HashSet::from(["exp".to_string(), "sub".to_string()]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            leeway_seconds: i64::try_from(leeway_seconds).unwrap_or(i64::MAX),
        }
    }

    pub fn encode(&self, principal: &Principal) -> Result<String, TokenError> {
        let claims = TokenClaimsRef {
            sub: principal.subject(),
            iat: principal.issued_at().timestamp(),
            exp: principal.expires_at().timestamp(),
            extra: principal.claims(),
        };

        let mut header = Header::new(Algorithm::HS256);
        header.typ = Some("JWT".to_string());
        jsonwebtoken::encode(&header, &claims, &self.encoding_key).map_err(TokenError::Signing)
    }

    pub fn decode(&self, token: &str) -> Result<Principal, TokenError> {
        self.decode_at(token, Utc::now())
    }

    /// Signature first, then expiry: a tampered token is reported as
    /// `InvalidSignature` even when it is also expired.
    pub fn decode_at(&self, token: &str, now: DateTime<Utc>) -> Result<Principal, TokenError> {
        let claims =
            jsonwebtoken::decode::<TokenClaims>(token, &self.decoding_key, &self.validation)?
                .claims;

        if now.timestamp() >= claims.exp.saturating_add(self.leeway_seconds) {
            return Err(TokenError::Expired);
        }

        if claims.sub.trim().is_empty() {
            return Err(TokenError::Malformed("empty 'sub' claim".to_string()));
        }

        let issued_at = DateTime::from_timestamp(claims.iat, 0)
            .ok_or_else(|| TokenError::Malformed("'iat' out of range".to_string()))?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .ok_or_else(|| TokenError::Malformed("'exp' out of range".to_string()))?;

        Ok(Principal::new(claims.sub, claims.extra, issued_at, expires_at))
    }
}
