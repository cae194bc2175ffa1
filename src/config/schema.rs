//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML. Every field
//! has a default, so an empty document yields a working two-service setup:
//! the stub origin on `:8081` and the proxy on `:8082` forwarding to it.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener for the stub origin service.
    pub origin: ListenerConfig,

    /// Listener and upstream target for the proxy service.
    pub proxy: ProxyServiceConfig,

    /// Per-connection timeouts, shared by both listeners.
    pub timeouts: TimeoutConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8081").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8081".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Proxy service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyServiceConfig {
    /// Bind address for the proxy listener.
    pub bind_address: String,

    /// Maximum concurrent inbound connections.
    pub max_connections: usize,

    /// Base URL of the origin every request is forwarded to.
    pub origin_url: String,
}

impl ProxyServiceConfig {
    /// Listener settings for the proxy side.
    pub fn listener(&self) -> ListenerConfig {
        ListenerConfig {
            bind_address: self.bind_address.clone(),
            max_connections: self.max_connections,
        }
    }
}

impl Default for ProxyServiceConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8082".to_string(),
            max_connections: 10_000,
            origin_url: "http://localhost:8081".to_string(),
        }
    }
}

/// Timeout configuration applied to every accepted connection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for reading request headers, in seconds.
    pub read_secs: u64,

    /// Deadline for producing response headers, in seconds.
    pub write_secs: u64,

    /// Connection is closed after this many seconds without traffic.
    pub idle_secs: u64,
}

impl TimeoutConfig {
    pub fn read(&self) -> Duration {
        Duration::from_secs(self.read_secs)
    }

    pub fn write(&self) -> Duration {
        Duration::from_secs(self.write_secs)
    }

    pub fn idle(&self) -> Duration {
        Duration::from_secs(self.idle_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            read_secs: 10,
            write_secs: 10,
            idle_secs: 15,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
