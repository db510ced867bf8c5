//! Shared fixtures for the integration tests: a counting session provider,
//! an in-memory log sink and a router with handlers covering every outcome.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use axum::{
    Json, Router,
    body::Body,
    http::Request,
    response::Response,
    routing::{get, post},
};
use chrono::{Duration, Utc};
use rest_pipeline::api::v1::extractors::{Authenticated, DbSession, Identity};
use rest_pipeline::error::{HandlerResult, StatusSignal};
use rest_pipeline::middleware::debug_headers::DebugHeaders;
use rest_pipeline::middleware::preflight;
use rest_pipeline::pipeline::Pipeline;
use rest_pipeline::repos::{RepoError, RepoResult, SessionProvider};
use rest_pipeline::services::auth::{Authenticator, Principal, TokenCodec};
use serde_json::{Value, json};
use tracing_subscriber::fmt::MakeWriter;

pub const SECRET: &[u8] = b"integration-test-secret";
pub const DB_TEXT: &str = "duplicate key value violates unique constraint \"users_email_key\"";

/// Session provider that counts acquisitions and releases.
#[derive(Default)]
pub struct CountingSessions {
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
    pub fail_acquire: bool,
}

impl CountingSessions {
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionProvider for CountingSessions {
    type Session = usize;

    async fn acquire(&self) -> RepoResult<usize> {
        if self.fail_acquire {
            return Err(RepoError::Db(sqlx::Error::PoolTimedOut));
        }
        Ok(self.acquired.fetch_add(1, Ordering::SeqCst))
    }

    async fn release(&self, _session: usize) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Captures formatted log output for the current thread.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

pub struct LogWriter(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("log buffer").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter(Arc::clone(&self.0))
    }
}

impl LogCapture {
    /// Install as the thread-local subscriber until the guard is dropped.
    /// `#[tokio::test]` runs on the current thread, so handler logs land here too.
    pub fn install() -> (Self, tracing::subscriber::DefaultGuard) {
        let capture = Self::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(capture.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (capture, guard)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().expect("log buffer")).into_owned()
    }
}

pub fn codec() -> TokenCodec {
    TokenCodec::new(SECRET, 0)
}

pub fn principal(subject: &str, ttl: Duration) -> Principal {
    let now = Utc::now();
    let claims = BTreeMap::from([
        ("roles".to_string(), json!(["admin"])),
        ("tenant".to_string(), json!("acme")),
    ]);
    Principal::new(subject, claims, now - Duration::hours(1), now + ttl)
}

pub fn token(subject: &str, ttl: Duration) -> String {
    codec().encode(&principal(subject, ttl)).expect("encode token")
}

async fn ok(DbSession(session): DbSession<CountingSessions>) -> HandlerResult<&'static str> {
    session.get().await?;
    Ok("ok")
}

async fn untouched() -> &'static str {
    "ok"
}

async fn not_found(
    DbSession(session): DbSession<CountingSessions>,
) -> HandlerResult<&'static str> {
    session.get().await?;
    Err(StatusSignal::not_found("not found").into())
}

async fn constraint_violation(
    DbSession(session): DbSession<CountingSessions>,
) -> HandlerResult<&'static str> {
    session.get().await?;
    Err(sqlx::Error::Protocol(DB_TEXT.to_string()).into())
}

async fn internal() -> HandlerResult<&'static str> {
    Err(anyhow!("disk /var/lib/app-secrets is full").into())
}

async fn boom(DbSession(session): DbSession<CountingSessions>) -> HandlerResult<&'static str> {
    session.get().await?;
    panic!("kaboom at /srv/internal/path");
}

async fn slow(DbSession(session): DbSession<CountingSessions>) -> HandlerResult<&'static str> {
    session.get().await?;
    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
    Ok("late")
}

async fn echo(Json(payload): Json<Value>) -> Json<Value> {
    Json(payload)
}

async fn whoami(identity: Identity) -> Json<Value> {
    Json(json!({
        "subject": identity.principal().map(|p| p.subject().to_string()),
    }))
}

async fn me(Authenticated(principal): Authenticated) -> Json<Value> {
    Json(json!({
        "subject": principal.subject(),
        "claims": principal.claims(),
    }))
}

pub struct TestApp {
    pub router: Router,
    pub sessions: Arc<CountingSessions>,
}

pub fn test_app(authenticator: Arc<dyn Authenticator>, debug: Option<DebugHeaders>) -> TestApp {
    test_app_with(authenticator, debug, CountingSessions::default())
}

pub fn test_app_with(
    authenticator: Arc<dyn Authenticator>,
    debug: Option<DebugHeaders>,
    sessions: CountingSessions,
) -> TestApp {
    let sessions = Arc::new(sessions);

    let mut pipeline = Pipeline::new(authenticator, Arc::clone(&sessions));
    if let Some(headers) = debug {
        pipeline = pipeline.with_debug_headers(headers);
    }

    let router = Router::new()
        .route("/ok", get(ok))
        .route("/untouched", get(untouched))
        .route("/not-found", get(not_found))
        .route("/constraint", get(constraint_violation))
        .route("/internal", get(internal))
        .route("/boom", get(boom))
        .route("/slow", get(slow))
        .route("/echo", post(echo))
        .route("/whoami", get(whoami))
        .route("/me", get(me));

    let router = preflight::apply(router);
    let router = pipeline.apply(router);

    TestApp { router, sessions }
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request build")
}

pub fn get_with_token(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-jwt-token", token)
        .body(Body::empty())
        .expect("request build")
}

pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body extraction");
    serde_json::from_slice(&bytes).expect("json deserialization")
}
