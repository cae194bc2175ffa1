//! Stand-in origin service.
//!
//! Answers every method and path with `200 OK` and a fixed text body. The
//! request body is drained frame by frame (never collected) so that a client
//! still uploading when the response goes out does not get its connection
//! reset.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::IntoResponse,
    Router,
};
use http_body_util::BodyExt;
use std::time::Instant;

use crate::observability::metrics;

/// Body returned for every request.
pub const ORIGIN_RESPONSE_BODY: &str = "origin server response";

/// The deterministic backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct OriginService;

impl OriginService {
    pub fn router(&self) -> Router {
        Router::new().fallback(origin_handler)
    }
}

async fn origin_handler(request: Request<Body>) -> impl IntoResponse {
    let start_time = Instant::now();
    let method = request.method().clone();

    tracing::info!(
        method = %method,
        path = %request.uri().path(),
        "Origin received request"
    );

    drain(request.into_body()).await;
    metrics::record_request("origin", &method, StatusCode::OK, start_time);

    ([(header::CONTENT_TYPE, "text/plain")], ORIGIN_RESPONSE_BODY)
}

async fn drain(mut body: Body) {
    while let Some(frame) = body.frame().await {
        if let Err(e) = frame {
            tracing::debug!(error = %e, "Request body ended early");
            return;
        }
    }
}
