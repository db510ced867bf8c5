/*
 * Responsibility
 * - v1 URL structure
 * - The pipeline is applied once around the whole app in app.rs, not here
 */
use axum::{Router, routing::get};

use crate::api::v1::handlers::{
    health::{db_health, health},
    me::me,
};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/db", get(db_health))
        .route("/me", get(me))
}
