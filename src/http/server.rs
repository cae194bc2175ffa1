//! HTTP server setup and connection serving.
//!
//! # Responsibilities
//! - Wrap a service router with middleware (tracing, handler deadline)
//! - Run the accept loop on a bounded listener
//! - Serve each connection on its own task over HTTP/1.1
//! - Enforce read, write and idle timeouts per connection
//!
//! The same server runs both the origin and the proxy; only the router and
//! the handler deadline differ.

use axum::{http::StatusCode, Router};
use hyper::server::conn::http1;
use hyper_util::{
    rt::{TokioIo, TokioTimer},
    service::TowerToHyperService,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::TimeoutConfig;
use crate::lifecycle::supervisor::ServiceKind;
use crate::net::connection::{Activity, ActivityStream, ConnectionId};
use crate::net::listener::{is_transient_accept_error, Listener, ListenerError};

/// HTTP server for one of the two services.
pub struct HttpServer {
    service: ServiceKind,
    router: Router,
    timeouts: TimeoutConfig,
}

impl HttpServer {
    /// Create a server for `router` with the given per-connection timeouts.
    pub fn new(service: ServiceKind, router: Router, timeouts: TimeoutConfig) -> Self {
        let router = Self::build_router(service, router, &timeouts);
        Self {
            service,
            router,
            timeouts,
        }
    }

    /// Add the middleware layers.
    ///
    /// The origin's handler deadline answers `408`. The proxy bounds its own
    /// upstream wait and answers `502`, so it gets no deadline layer here.
    fn build_router(service: ServiceKind, router: Router, timeouts: &TimeoutConfig) -> Router {
        let router = match service {
            ServiceKind::Origin => router.layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                timeouts.write(),
            )),
            ServiceKind::Proxy => router,
        };
        router.layer(TraceLayer::new_for_http())
    }

    /// Serve until the listener fails.
    pub async fn run(self, listener: Listener) -> Result<(), ListenerError> {
        self.run_until(listener, std::future::pending()).await
    }

    /// Serve until the listener fails or `shutdown` resolves.
    ///
    /// Resolving `shutdown` stops accepting and returns `Ok(())`. Connections
    /// already accepted keep running on their own tasks.
    pub async fn run_until<F>(self, listener: Listener, shutdown: F) -> Result<(), ListenerError>
    where
        F: Future<Output = ()> + Send,
    {
        let addr = listener.local_addr().map_err(ListenerError::Accept)?;
        tracing::info!(
            service = %self.service,
            address = %addr,
            "HTTP server starting"
        );

        tokio::pin!(shutdown);

        loop {
            let (stream, peer_addr, permit) = tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(ListenerError::Accept(e)) if is_transient_accept_error(&e) => {
                        tracing::warn!(service = %self.service, error = %e, "Transient accept error");
                        continue;
                    }
                    Err(e) => {
                        tracing::error!(service = %self.service, address = %addr, error = %e, "Listener failed");
                        return Err(e);
                    }
                },
                _ = &mut shutdown => {
                    tracing::warn!(service = %self.service, address = %addr, "Listener stopped");
                    return Ok(());
                }
            };

            let router = self.router.clone();
            let timeouts = self.timeouts.clone();
            let service = self.service;
            tokio::spawn(async move {
                serve_connection(service, stream, peer_addr, router, &timeouts).await;
                drop(permit);
            });
        }
    }
}

/// Drive one HTTP/1.1 connection to completion.
///
/// The header read deadline is hyper's; the idle deadline is ours. An idle
/// connection is asked to shut down gracefully, and dropped if it is still
/// silent after another idle period.
///
/// hyper also runs the header read timer while a keep-alive connection waits
/// for its next request, so an idle keep-alive connection is closed after
/// `min(read_secs, idle_secs)`.
async fn serve_connection(
    service: ServiceKind,
    stream: TcpStream,
    peer_addr: SocketAddr,
    router: Router,
    timeouts: &TimeoutConfig,
) {
    let connection_id = ConnectionId::new();
    let activity = Activity::new();
    let io = TokioIo::new(ActivityStream::new(stream, Arc::clone(&activity)));

    let mut builder = http1::Builder::new();
    builder
        .timer(TokioTimer::new())
        .header_read_timeout(timeouts.read());
    let conn = builder.serve_connection(io, TowerToHyperService::new(router));
    tokio::pin!(conn);

    let idle_limit = timeouts.idle();
    let mut draining = false;

    loop {
        tokio::select! {
            result = conn.as_mut() => {
                if let Err(e) = result {
                    tracing::debug!(
                        service = %service,
                        connection_id = %connection_id,
                        peer_addr = %peer_addr,
                        error = %e,
                        "Connection ended with error"
                    );
                }
                break;
            }
            _ = activity.idle(idle_limit) => {
                if draining {
                    tracing::debug!(
                        service = %service,
                        connection_id = %connection_id,
                        "Idle connection did not close, dropping"
                    );
                    break;
                }
                tracing::debug!(
                    service = %service,
                    connection_id = %connection_id,
                    idle_secs = idle_limit.as_secs(),
                    "Closing idle connection"
                );
                conn.as_mut().graceful_shutdown();
                activity.touch();
                draining = true;
            }
        }
    }

    tracing::trace!(service = %service, connection_id = %connection_id, "Connection closed");
}
