//! Factory: build the request `Authenticator` from application `Config`.

use std::sync::Arc;

use crate::config::Config;
use crate::services::auth::{Authenticator, JwtAuthenticator, TokenCodec};

pub fn build_token_codec(config: &Config) -> TokenCodec {
    TokenCodec::new(config.token_secret.as_bytes(), config.token_leeway_seconds)
}

pub fn build_authenticator(config: &Config) -> Arc<dyn Authenticator> {
    let auth = JwtAuthenticator::new(build_token_codec(config))
        .with_header(config.token_header.clone())
        .on_expired(config.expired_token_policy)
        .on_invalid(config.invalid_token_policy);

    Arc::new(auth)
}
