//! Request forwarding to the configured origin.
//!
//! Every inbound request becomes a freshly built outbound request:
//! same method, same path and query, same headers (minus `Host`, which the
//! client derives from the origin authority) and the inbound body stream
//! handed over as-is. Nothing is buffered and nothing is retried.
//!
//! The wait for the origin's response head is bounded by the write timeout.
//! Expiry is an upstream failure like any other and answers `502`.

use axum::{
    body::Body,
    extract::State,
    http::{
        header,
        uri::{Authority, PathAndQuery, Scheme},
        Request, Uri,
    },
    response::{IntoResponse, Response},
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::time::{Duration, Instant};

use crate::config::{ProxyServiceConfig, TimeoutConfig};
use crate::http::response::relay;
use crate::observability::metrics;

/// Outbound HTTP client shared by all requests of a proxy service.
pub type HttpClient = Client<HttpConnector, Body>;

/// Build the default pooled client.
pub fn default_client() -> HttpClient {
    Client::builder(TokioExecutor::new()).build(HttpConnector::new())
}

/// Why an origin URL cannot be used as a forwarding target.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidOrigin {
    #[error("invalid URL '{url}': {reason}")]
    Url { url: String, reason: String },

    #[error("unsupported scheme '{0}', only http is supported")]
    Scheme(String),

    #[error("'{0}' has no host")]
    MissingHost(String),

    #[error("'{0}' must not carry a path, query, fragment or credentials")]
    NotABase(String),
}

/// Scheme and authority every outbound request is sent to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginTarget {
    scheme: Scheme,
    authority: Authority,
}

impl OriginTarget {
    /// Parse a base URL such as `http://localhost:8081`.
    pub fn parse(raw: &str) -> Result<Self, InvalidOrigin> {
        let url = url::Url::parse(raw).map_err(|e| InvalidOrigin::Url {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;

        if url.scheme() != "http" {
            return Err(InvalidOrigin::Scheme(url.scheme().to_string()));
        }
        let host = url
            .host_str()
            .ok_or_else(|| InvalidOrigin::MissingHost(raw.to_string()))?;
        if url.path() != "/"
            || url.query().is_some()
            || url.fragment().is_some()
            || !url.username().is_empty()
            || url.password().is_some()
        {
            return Err(InvalidOrigin::NotABase(raw.to_string()));
        }

        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let authority = authority.parse::<Authority>().map_err(|e| InvalidOrigin::Url {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            scheme: Scheme::HTTP,
            authority,
        })
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Absolute URI on the origin for the given inbound path and query.
    pub fn uri_for(&self, path_and_query: Option<&PathAndQuery>) -> Result<Uri, axum::http::Error> {
        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path_and_query.map(PathAndQuery::as_str).unwrap_or("/"))
            .build()
    }
}

/// Failure to forward a single request.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    /// The outbound request could not be constructed.
    #[error("Error creating request: {0}")]
    Build(#[from] axum::http::Error),

    /// The origin could not be reached or the exchange broke before headers arrived.
    #[error("upstream request failed: {0}")]
    Upstream(#[source] hyper_util::client::legacy::Error),

    /// The origin did not produce a response head in time.
    #[error("upstream request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

/// The forwarding front end.
///
/// Cheap to clone: the client is a handle onto one shared connection pool.
#[derive(Clone)]
pub struct ProxyService {
    origin: OriginTarget,
    client: HttpClient,
    timeout: Duration,
}

impl ProxyService {
    pub fn new(origin: OriginTarget, client: HttpClient) -> Self {
        Self {
            origin,
            client,
            timeout: TimeoutConfig::default().write(),
        }
    }

    /// Bound the wait for each upstream response head.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_config(config: &ProxyServiceConfig, client: HttpClient) -> Result<Self, InvalidOrigin> {
        Ok(Self::new(OriginTarget::parse(&config.origin_url)?, client))
    }

    pub fn origin(&self) -> &OriginTarget {
        &self.origin
    }

    /// Router sending every method and path through [`ProxyService::forward`].
    pub fn router(&self) -> Router {
        Router::new().fallback(proxy_handler).with_state(self.clone())
    }

    /// Relay one request to the origin and return what should go back to the caller.
    pub async fn forward(&self, inbound: Request<Body>) -> Response {
        let start_time = Instant::now();
        let method = inbound.method().clone();

        tracing::info!(
            method = %method,
            path = %inbound.uri().path(),
            "Proxying request"
        );

        let response = match self.try_forward(inbound).await {
            Ok(response) => response,
            Err(e) => e.into_response(),
        };

        metrics::record_request("proxy", &method, response.status(), start_time);
        response
    }

    async fn try_forward(&self, inbound: Request<Body>) -> Result<Response, ForwardError> {
        let outbound = self.build_outbound(inbound)?;
        let upstream = tokio::time::timeout(self.timeout, self.client.request(outbound))
            .await
            .map_err(|_| ForwardError::Timeout(self.timeout))?
            .map_err(ForwardError::Upstream)?;
        Ok(relay(upstream))
    }

    /// Build the outbound request for `inbound`, taking ownership of its body stream.
    pub fn build_outbound(&self, inbound: Request<Body>) -> Result<Request<Body>, ForwardError> {
        let (parts, body) = inbound.into_parts();
        let uri = self.origin.uri_for(parts.uri.path_and_query())?;

        let mut headers = parts.headers;
        headers.remove(header::HOST);

        let mut outbound = Request::builder().method(parts.method).uri(uri).body(body)?;
        *outbound.headers_mut() = headers;
        Ok(outbound)
    }
}

async fn proxy_handler(State(proxy): State<ProxyService>, request: Request<Body>) -> Response {
    proxy.forward(request).await
}
