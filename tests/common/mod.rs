//! Shared utilities for integration tests.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use relay_proxy::config::{ListenerConfig, TimeoutConfig};
use relay_proxy::http::{default_client, HttpServer, OriginService, OriginTarget, ProxyService};
use relay_proxy::lifecycle::ServiceKind;
use relay_proxy::net::Listener;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Bind a bounded listener on an ephemeral local port.
pub async fn bind_ephemeral() -> Listener {
    Listener::bind(&ListenerConfig {
        bind_address: "127.0.0.1:0".into(),
        max_connections: 1024,
    })
    .await
    .unwrap()
}

/// An address nothing is listening on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Run `router` behind the real server on an ephemeral port.
pub async fn start_server(service: ServiceKind, router: Router, timeouts: TimeoutConfig) -> SocketAddr {
    let listener = bind_ephemeral().await;
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(service, router, timeouts);
    tokio::spawn(async move {
        let _ = server.run(listener).await;
    });
    addr
}

pub async fn start_origin() -> SocketAddr {
    start_server(ServiceKind::Origin, OriginService.router(), TimeoutConfig::default()).await
}

pub async fn start_proxy(origin: SocketAddr) -> SocketAddr {
    start_proxy_with(origin, TimeoutConfig::default()).await
}

/// Proxy whose upstream wait and listener use `timeouts`.
pub async fn start_proxy_with(origin: SocketAddr, timeouts: TimeoutConfig) -> SocketAddr {
    let target = OriginTarget::parse(&format!("http://{origin}")).unwrap();
    let proxy = ProxyService::new(target, default_client()).with_timeout(timeouts.write());
    start_server(ServiceKind::Proxy, proxy.router(), timeouts).await
}

/// Backend that streams the request body straight back.
///
/// The method, path+query and `Host` it received are reported in
/// `x-echo-method`, `x-echo-path` and `x-echo-host`.
pub async fn start_echo_backend() -> SocketAddr {
    start_server(
        ServiceKind::Origin,
        Router::new().fallback(echo),
        TimeoutConfig::default(),
    )
    .await
}

async fn echo(request: Request<Body>) -> Response<Body> {
    let (parts, body) = request.into_parts();
    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert("x-echo-method", parts.method.as_str().parse().unwrap());
    if let Some(path_and_query) = parts.uri.path_and_query() {
        headers.insert("x-echo-path", path_and_query.as_str().parse().unwrap());
    }
    if let Some(host) = parts.headers.get(header::HOST) {
        headers.insert("x-echo-host", host.clone());
    }
    response
}

/// Start a raw socket backend that answers every request with `response` verbatim.
pub async fn start_raw_backend(response: &'static str) -> SocketAddr {
    start_scripted_backend(vec![response]).await
}

/// Raw socket backend where the n-th connection gets `responses[n]`.
///
/// Connections past the end of the script reuse the last response.
pub async fn start_scripted_backend(responses: Vec<&'static str>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut served = 0usize;
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let response = responses[served.min(responses.len() - 1)];
                    served += 1;
                    tokio::spawn(async move {
                        read_request_head(&mut socket).await;
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

async fn read_request_head(socket: &mut TcpStream) {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Poll `url` until something answers or `timeout` elapses.
pub async fn wait_for_server(url: &str, timeout: Duration) -> bool {
    let client = client();
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if client.get(url).send().await.is_ok() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    false
}
