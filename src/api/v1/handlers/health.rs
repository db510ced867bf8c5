/*
 * Responsibility
 * - GET /health: liveness + application identity (no storage access)
 * - GET /health/db: storage round-trip through the request's session
 */
use axum::{Json, extract::State};
use serde::Serialize;

use crate::api::v1::extractors::DbSession;
use crate::error::HandlerResult;
use crate::repos::session::PgSessions;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub name: String,
    pub version: String,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        name: state.info.name.clone(),
        version: state.info.version.clone(),
    })
}

#[derive(Debug, Serialize)]
pub struct DbHealthResponse {
    pub status: &'static str,
}

pub async fn db_health(
    DbSession(session): DbSession<PgSessions>,
) -> HandlerResult<Json<DbHealthResponse>> {
    let mut conn = session.get().await?;
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&mut **conn)
        .await?;

    Ok(Json(DbHealthResponse { status: "ok" }))
}
