//! Configuration validation.
//!
//! Serde handles the syntax; this module checks semantics. All problems are
//! collected and returned together rather than stopping at the first.

use std::net::SocketAddr;

use crate::config::schema::{ListenerConfig, ProxyConfig};
use crate::http::proxy::OriginTarget;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: '{value}' is not a socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("proxy.origin_url: {0}")]
    InvalidOriginUrl(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_listener(
        &config.origin,
        ("origin.bind_address", "origin.max_connections"),
        &mut errors,
    );
    check_listener(
        &config.proxy.listener(),
        ("proxy.bind_address", "proxy.max_connections"),
        &mut errors,
    );

    if let Err(e) = OriginTarget::parse(&config.proxy.origin_url) {
        errors.push(ValidationError::InvalidOriginUrl(e.to_string()));
    }

    let timeouts = &config.timeouts;
    for (name, value) in [
        ("timeouts.read_secs", timeouts.read_secs),
        ("timeouts.write_secs", timeouts.write_secs),
        ("timeouts.idle_secs", timeouts.idle_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::Zero(name));
        }
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_listener(
    listener: &ListenerConfig,
    (address_field, limit_field): (&'static str, &'static str),
    errors: &mut Vec<ValidationError>,
) {
    if listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: address_field,
            value: listener.bind_address.clone(),
        });
    }
    if listener.max_connections == 0 {
        errors.push(ValidationError::Zero(limit_field));
    }
}
