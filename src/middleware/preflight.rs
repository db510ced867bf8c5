//! Answer `OPTIONS` requests without routing them.
//!
//! Applied inside the pipeline, so preflight responses still go through
//! finalization and receive the debug headers.

use axum::{
    Router,
    body::Body,
    extract::Request,
    http::{HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};

pub fn apply(router: Router) -> Router {
    router.layer(middleware::from_fn(preflight))
}

async fn preflight(req: Request<Body>, next: Next) -> Response {
    if req.method() != Method::OPTIONS {
        return next.run(req).await;
    }

    (
        StatusCode::OK,
        [(header::CACHE_CONTROL, HeaderValue::from_static("no-cache,no-store"))],
    )
        .into_response()
}
