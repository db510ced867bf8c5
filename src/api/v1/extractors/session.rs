use anyhow::anyhow;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::Failure;
use crate::pipeline::SessionHandle;
use crate::repos::session::SessionProvider;

/// Handler argument giving access to the request's storage session.
/// The session itself is only acquired on `get`.
pub struct DbSession<P: SessionProvider>(pub SessionHandle<P>);

impl<S, P> FromRequestParts<S> for DbSession<P>
where
    S: Send + Sync,
    P: SessionProvider,
{
    type Rejection = Failure;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionHandle<P>>()
            .cloned()
            .map(DbSession)
            .ok_or_else(|| {
                Failure::Internal(anyhow!("storage session missing, pipeline not installed"))
            })
    }
}
