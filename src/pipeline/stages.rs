//! The request pipeline:
//! `Start → Authenticating → Dispatching → (Normal | Failed) → Finalizing → Done`.
//!
//! Installed as an axum middleware around the application routes. Every exit
//! path of `handle` goes through `finalize`, which releases the storage session.
//! A request dropped mid-flight releases it from `SessionHandle`'s drop instead.
//!
//! Error responses produced by axum itself (unmatched route, wrong method,
//! extractor rejections) are mapped into the same taxonomy as handler failures.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::anyhow;
use axum::{
    Router,
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use futures_util::FutureExt;
use tracing::Instrument;

use crate::error::{EscapedFailure, Failure, StatusSignal};
use crate::middleware::debug_headers::DebugHeaders;
use crate::middleware::http::REQUEST_ID_HEADER;
use crate::pipeline::context::RequestContext;
use crate::pipeline::normalizer::normalize;
use crate::repos::session::SessionProvider;
use crate::services::auth::Authenticator;

// Framework rejection bodies are short plain-text messages.
const FRAMEWORK_BODY_LIMIT: usize = 16 * 1024;

enum Outcome {
    Normal(Response),
    Failed(Failure),
}

pub struct Pipeline<P: SessionProvider> {
    authenticator: Arc<dyn Authenticator>,
    sessions: Arc<P>,
    debug_headers: Option<DebugHeaders>,
}

impl<P: SessionProvider> Pipeline<P> {
    pub fn new(authenticator: Arc<dyn Authenticator>, sessions: Arc<P>) -> Self {
        Self {
            authenticator,
            sessions,
            debug_headers: None,
        }
    }

    /// Enable debug mode: `headers` are added to every response.
    pub fn with_debug_headers(mut self, headers: DebugHeaders) -> Self {
        self.debug_headers = Some(headers);
        self
    }

    /// Wrap every route (and the fallback) of `router` in the pipeline.
    pub fn apply<S>(self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.layer(middleware::from_fn_with_state(Arc::new(self), run::<P>))
    }

    pub async fn handle(&self, req: Request, next: Next) -> Response {
        let request_id = req
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok());
        let mut ctx = RequestContext::new(request_id, Arc::clone(&self.sessions));

        let span = tracing::info_span!(
            "request",
            request_id = %ctx.id(),
            method = %req.method(),
            path = %req.uri().path(),
        );

        async move {
            let outcome = match self.authenticator.authenticate(req.headers()).await {
                Ok(principal) => {
                    ctx.set_principal(principal);
                    self.dispatch(&mut ctx, req, next).await
                }
                Err(signal) => {
                    tracing::debug!("authentication rejected the request");
                    Outcome::Failed(signal.into())
                }
            };

            let response = match outcome {
                Outcome::Normal(response) => response,
                Outcome::Failed(failure) => normalize(failure).into_response(),
            };

            self.finalize(ctx, response).await
        }
        .instrument(span)
        .await
    }

    async fn dispatch(
        &self,
        ctx: &mut RequestContext<P>,
        mut req: Request,
        next: Next,
    ) -> Outcome {
        req.extensions_mut().insert(ctx.identity());
        req.extensions_mut().insert(ctx.session().clone());

        match AssertUnwindSafe(next.run(req)).catch_unwind().await {
            Ok(mut response) => {
                let escaped = response
                    .extensions_mut()
                    .remove::<EscapedFailure>()
                    .and_then(|escaped| escaped.take());
                match escaped {
                    Some(failure) => Outcome::Failed(failure),
                    None if is_framework_error(&response) => {
                        keep_allow_header(response.headers(), ctx.response_headers_mut());
                        Outcome::Failed(framework_failure(response).await)
                    }
                    None => Outcome::Normal(response),
                }
            }
            Err(panic) => Outcome::Failed(Failure::Internal(anyhow!(
                "handler panicked: {}",
                panic_message(panic.as_ref())
            ))),
        }
    }

    /// Header attachment is best-effort; the session release is not.
    async fn finalize(&self, mut ctx: RequestContext<P>, mut response: Response) -> Response {
        if let Some(debug) = &self.debug_headers {
            debug.append_to(ctx.response_headers_mut());
        }

        let headers = response.headers_mut();
        for (name, value) in ctx.response_headers() {
            headers.append(name.clone(), value.clone());
        }

        if ctx.session().release().await {
            tracing::debug!("storage session released");
        }

        response
    }
}

async fn run<P: SessionProvider>(
    State(pipeline): State<Arc<Pipeline<P>>>,
    req: Request,
    next: Next,
) -> Response {
    pipeline.handle(req, next).await
}

/// An error status without a JSON body: not written through `Failure`, so it
/// came from axum (unmatched route, 405, extractor rejections) or a handler
/// returning a bare status code.
fn is_framework_error(response: &Response) -> bool {
    let status = response.status();
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));

    (status.is_client_error() || status.is_server_error()) && !is_json
}

/// 4xx bodies from axum are written for clients and become the signal's
/// message. 5xx bodies are not trusted and are treated as internal failures.
async fn framework_failure(response: Response) -> Failure {
    let status = response.status();
    let text = match axum::body::to_bytes(response.into_body(), FRAMEWORK_BODY_LIMIT).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).trim().to_string(),
        Err(err) => {
            tracing::debug!(error = %err, "unreadable framework error body");
            String::new()
        }
    };

    if status.is_server_error() {
        return Failure::Internal(anyhow!("framework error response {status}: {text}"));
    }

    let message = if text.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_ascii_lowercase()
    } else {
        text
    };
    StatusSignal::new(status, message).into()
}

fn keep_allow_header(from: &HeaderMap, into: &mut HeaderMap) {
    for value in from.get_all(header::ALLOW) {
        into.append(header::ALLOW, value.clone());
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
