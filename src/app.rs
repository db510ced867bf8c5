/*
 * Responsibility
 * - Config → dependencies → Router
 * - Layer order (outer → inner): transport (http) → pipeline → preflight → routes
 * - axum::serve() startup
 */
use std::{panic, sync::Arc};

use anyhow::Result;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::Config;
use crate::middleware;
use crate::pipeline::Pipeline;
use crate::repos::session::PgSessions;
use crate::services::auth::build_authenticator;
use crate::state::{AppInfo, AppState};

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex: RUST_LOG=info,rest_pipeline=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook() {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // Surface panics through tracing too; stderr may not be collected.
        // Handler panics are additionally turned into 500s by the pipeline.
        tracing::error!(%info, "panic");
        default_hook(info);
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    init_panic_hook();

    let config = Config::from_env()?;
    tracing::info!(
        name = %config.app_name,
        version = %config.app_version,
        debug = config.debug,
        "starting API in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect_lazy(&config.database_url)?;

    let app = build_router(&config, PgSessions::new(pool));

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(config: &Config, sessions: PgSessions) -> Router {
    let state = AppState::new(AppInfo::from(config));

    let mut pipeline = Pipeline::new(build_authenticator(config), Arc::new(sessions));
    if config.debug {
        pipeline = pipeline.with_debug_headers(config.debug_headers.clone());
    }

    let router = Router::new()
        .nest("/api/v1", api::v1::routes())
        .with_state(state);

    let router = middleware::preflight::apply(router);
    let router = pipeline.apply(router);
    middleware::http::apply(router, config)
}
