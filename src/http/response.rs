//! Response handling and error mapping.
//!
//! # Responsibilities
//! - Relay the upstream response to the caller (status, every header value, body)
//! - Stream the body through without buffering it
//! - Map forwarding failures (including upstream timeouts) to 502 / 500 responses
//!
//! # Design Decisions
//! - Headers are appended one value at a time so repeated keys survive
//! - A body that breaks mid-stream is logged; the caller's connection is
//!   aborted by the server since status and headers are already committed

use axum::{
    body::Body,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use std::error::Error as StdError;

use crate::http::proxy::ForwardError;
use crate::observability::metrics;

/// Turn an upstream response into the response sent back to the caller.
pub fn relay(upstream: Response<Incoming>) -> Response {
    let (parts, body) = upstream.into_parts();

    let body = body.map_err(|e| {
        tracing::warn!(error = %e, "Error copying response body");
        metrics::record_upstream_error("body");
        e
    });

    let mut response = Response::new(Body::new(body));
    *response.status_mut() = parts.status;
    let headers = response.headers_mut();
    for (name, value) in parts.headers.iter() {
        headers.append(name.clone(), value.clone());
    }
    response
}

/// Render an error and all of its sources as one line.
pub fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut description = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        description.push_str(": ");
        description.push_str(&cause.to_string());
        source = cause.source();
    }
    description
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        match self {
            ForwardError::Build(e) => {
                tracing::error!(error = %e, "Failed to build outbound request");
                (StatusCode::INTERNAL_SERVER_ERROR, "Error creating request").into_response()
            }
            ForwardError::Upstream(e) => {
                let description = error_chain(&e);
                tracing::error!(error = %description, "Upstream error");
                metrics::record_upstream_error(if e.is_connect() { "connect" } else { "request" });
                (StatusCode::BAD_GATEWAY, description).into_response()
            }
            ForwardError::Timeout(after) => {
                let description = ForwardError::Timeout(after).to_string();
                tracing::error!(error = %description, "Upstream error");
                metrics::record_upstream_error("timeout");
                (StatusCode::BAD_GATEWAY, description).into_response()
            }
        }
    }
}
