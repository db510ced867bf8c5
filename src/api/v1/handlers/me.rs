/*
 * Responsibility
 * - GET /me: the principal the pipeline established for this request
 */
use std::collections::BTreeMap;

use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::api::v1::extractors::Authenticated;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub subject: String,
    pub claims: BTreeMap<String, Value>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

pub async fn me(Authenticated(principal): Authenticated) -> Json<MeResponse> {
    Json(MeResponse {
        subject: principal.subject().to_string(),
        claims: principal.claims().clone(),
        issued_at: principal.issued_at(),
        expires_at: principal.expires_at(),
    })
}
