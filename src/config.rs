/*
 * Responsibility
 * - Read settings from the environment (DATABASE_URL, TOKEN_SECRET, APP_DEBUG, ...)
 * - Validate them up front (missing / unparseable => startup fails)
 * - `from_lookup` takes any key lookup so parsing can be tested without touching env
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderName;

use crate::middleware::debug_headers::DebugHeaders;
use crate::services::auth::TokenFailurePolicy;
use crate::services::auth::authenticator::DEFAULT_TOKEN_HEADER;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(value: Option<String>) -> Self {
        match value
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub app_name: String,
    pub app_version: String,
    // Adds the debug response headers to every response
    pub debug: bool,
    pub debug_headers: DebugHeaders,

    pub database_url: String,
    pub database_max_connections: u32,

    pub token_secret: String,
    pub token_header: HeaderName,
    pub token_leeway_seconds: u64,
    pub expired_token_policy: TokenFailurePolicy,
    pub invalid_token_policy: TokenFailurePolicy,

    pub request_timeout: Duration,
    pub request_body_limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = parse_or(&lookup, "PORT", 3000)?;
        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(lookup("APP_ENV"));
        let app_name = lookup("APP_NAME").unwrap_or_else(|| "rest-pipeline".to_string());
        let app_version =
            lookup("APP_VERSION").unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

        let debug = match lookup("APP_DEBUG") {
            Some(v) => parse_bool(&v).ok_or(ConfigError::Invalid("APP_DEBUG"))?,
            None => false,
        };

        let defaults = DebugHeaders::default();
        let debug_headers = DebugHeaders {
            allow_methods: lookup("DEBUG_ALLOW_METHODS").unwrap_or(defaults.allow_methods),
            allow_headers: lookup("DEBUG_ALLOW_HEADERS").unwrap_or(defaults.allow_headers),
            expose_headers: lookup("DEBUG_EXPOSE_HEADERS").unwrap_or(defaults.expose_headers),
            allow_credentials: lookup("DEBUG_ALLOW_CREDENTIALS")
                .unwrap_or(defaults.allow_credentials),
        };

        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let database_max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?;

        let token_secret = lookup("TOKEN_SECRET").ok_or(ConfigError::Missing("TOKEN_SECRET"))?;
        if token_secret.is_empty() {
            return Err(ConfigError::Invalid("TOKEN_SECRET"));
        }

        let token_header = lookup("TOKEN_HEADER")
            .unwrap_or_else(|| DEFAULT_TOKEN_HEADER.to_string())
            .to_ascii_lowercase();
        let token_header =
            HeaderName::from_str(&token_header).map_err(|_| ConfigError::Invalid("TOKEN_HEADER"))?;

        let token_leeway_seconds = parse_or(&lookup, "TOKEN_LEEWAY_SECONDS", 0)?;
        let expired_token_policy = parse_or(
            &lookup,
            "EXPIRED_TOKEN_POLICY",
            TokenFailurePolicy::Anonymous,
        )?;
        let invalid_token_policy = parse_or(
            &lookup,
            "INVALID_TOKEN_POLICY",
            TokenFailurePolicy::Anonymous,
        )?;

        let request_timeout =
            Duration::from_secs(parse_or(&lookup, "REQUEST_TIMEOUT_SECONDS", 30)?);
        let request_body_limit = parse_or(&lookup, "REQUEST_BODY_LIMIT_BYTES", 1024 * 1024)?;

        Ok(Config {
            addr,
            app_env,
            app_name,
            app_version,
            debug,
            debug_headers,
            database_url,
            database_max_connections,
            token_secret,
            token_header,
            token_leeway_seconds,
            expired_token_policy,
            invalid_token_policy,
            request_timeout,
            request_body_limit,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
