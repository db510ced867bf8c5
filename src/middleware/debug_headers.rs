//! CORS-style response headers added to every response in debug mode.
//!
//! Existing browser clients depend on these names and values, so the defaults
//! must stay byte-for-byte as they are. Values can be overridden from `Config`,
//! which is why attaching them is fallible.

use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_EXPOSE_HEADERS,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue};

pub const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, UNDELETE, METADATA, PATCH, SEARCH";
pub const ALLOW_HEADERS: &str =
    "Content-Type, Authorization, Content-Length, Connection, If-Match, If-None-Match";
pub const EXPOSE_HEADERS: &str = "Content-Type, Content-Length, X-Pagination-Count, \
    X-Pagination-Skip, X-Pagination-Take, X-New-JWT-Token, ETag, X-Reason";
pub const ALLOW_CREDENTIALS: &str = "true";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugHeaders {
    pub allow_methods: String,
    pub allow_headers: String,
    pub expose_headers: String,
    pub allow_credentials: String,
}

impl Default for DebugHeaders {
    fn default() -> Self {
        Self {
            allow_methods: ALLOW_METHODS.to_string(),
            allow_headers: ALLOW_HEADERS.to_string(),
            expose_headers: EXPOSE_HEADERS.to_string(),
            allow_credentials: ALLOW_CREDENTIALS.to_string(),
        }
    }
}

impl DebugHeaders {
    fn entries(&self) -> [(HeaderName, &str); 4] {
        [
            (ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.as_str()),
            (ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.as_str()),
            (ACCESS_CONTROL_EXPOSE_HEADERS, self.expose_headers.as_str()),
            (ACCESS_CONTROL_ALLOW_CREDENTIALS, self.allow_credentials.as_str()),
        ]
    }

    /// Best-effort: a value that is not a valid header value is logged and
    /// skipped, the others are still appended. Returns how many were appended.
    pub fn append_to(&self, headers: &mut HeaderMap) -> usize {
        let mut appended = 0;
        for (name, value) in self.entries() {
            match HeaderValue::from_str(value) {
                Ok(value) => {
                    headers.append(name, value);
                    appended += 1;
                }
                Err(err) => {
                    tracing::warn!(
                        header = %name,
                        error = %err,
                        "skipping unrepresentable debug header"
                    );
                }
            }
        }
        appended
    }
}
