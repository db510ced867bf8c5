use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Claim names carried by the token itself; never part of `claims`.
pub const RESERVED_CLAIMS: [&str; 3] = ["sub", "iat", "exp"];

/// The authenticated identity of one request.
///
/// - Built by `TokenCodec` from a verified token, or by the login flow before encoding.
/// - Lives in the request context for one request only; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Principal {
    subject: String,
    claims: BTreeMap<String, Value>,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl Principal {
    /// Reserved claim names (`sub`, `iat`, `exp`) are dropped from `claims`.
    pub fn new(
        subject: impl Into<String>,
        mut claims: BTreeMap<String, Value>,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        claims.retain(|name, _| !RESERVED_CLAIMS.contains(&name.as_str()));
        Self {
            subject: subject.into(),
            claims,
            issued_at,
            expires_at,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn claims(&self) -> &BTreeMap<String, Value> {
        &self.claims
    }

    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}
