pub mod authenticator;
pub mod factory;
pub mod principal;
pub mod token_codec;

pub use authenticator::{
    AnonymousAuthenticator, Authenticator, JwtAuthenticator, TokenFailurePolicy,
};
pub use factory::build_authenticator;
pub use principal::Principal;
pub use token_codec::{TokenCodec, TokenError};
