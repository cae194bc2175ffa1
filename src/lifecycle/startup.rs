//! Startup orchestration.
//!
//! Builds both services from a validated config and hands them to a
//! [`Supervisor`]. Binding happens inside each service task, so a port that
//! cannot be bound surfaces through the supervisor like any other listener
//! failure.

use crate::config::ProxyConfig;
use crate::http::origin::OriginService;
use crate::http::proxy::{default_client, InvalidOrigin, ProxyService};
use crate::http::server::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::supervisor::{ServiceKind, Supervisor};
use crate::net::listener::Listener;

/// Start the origin and proxy services.
///
/// Both listeners stop accepting when `shutdown` is triggered.
pub fn launch(config: &ProxyConfig, shutdown: &Shutdown) -> Result<Supervisor, InvalidOrigin> {
    let proxy = ProxyService::from_config(&config.proxy, default_client())?
        .with_timeout(config.timeouts.write());
    let mut supervisor = Supervisor::new();

    let origin_server = HttpServer::new(
        ServiceKind::Origin,
        OriginService.router(),
        config.timeouts.clone(),
    );
    let origin_listener = config.origin.clone();
    let origin_shutdown = shutdown.signal();
    supervisor.spawn(ServiceKind::Origin, async move {
        let listener = Listener::bind(&origin_listener).await?;
        origin_server.run_until(listener, origin_shutdown).await
    });

    tracing::info!(origin = %proxy.origin().authority(), "Forwarding target configured");
    let proxy_server = HttpServer::new(ServiceKind::Proxy, proxy.router(), config.timeouts.clone());
    let proxy_listener = config.proxy.listener();
    let proxy_shutdown = shutdown.signal();
    supervisor.spawn(ServiceKind::Proxy, async move {
        let listener = Listener::bind(&proxy_listener).await?;
        proxy_server.run_until(listener, proxy_shutdown).await
    });

    Ok(supervisor)
}
