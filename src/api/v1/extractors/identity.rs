/*
 * Responsibility
 * - Hand the identity established by the pipeline to handlers
 * - Identity: possibly anonymous; Authenticated: 401 when anonymous
 * - Missing extension means the pipeline is not installed => internal failure
 */
use anyhow::anyhow;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::{Failure, StatusSignal};
use crate::pipeline::Identity;
use crate::services::auth::Principal;

fn identity_of(parts: &Parts) -> Result<Identity, Failure> {
    parts
        .extensions
        .get::<Identity>()
        .cloned()
        .ok_or_else(|| {
            Failure::Internal(anyhow!("request identity missing, pipeline not installed"))
        })
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = Failure;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        identity_of(parts)
    }
}

/// Handler argument that requires an authenticated principal.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Principal);

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = Failure;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match identity_of(parts)?.0 {
            Some(principal) => Ok(Authenticated(principal)),
            None => Err(StatusSignal::unauthorized("authentication required").into()),
        }
    }
}
