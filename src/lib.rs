//! Single-origin HTTP reverse proxy.
//!
//! ```text
//!   client ──▶ proxy service ──▶ origin service
//!          ◀──               ◀──
//! ```
//!
//! Two services run side by side under one supervisor: a stub origin that
//! answers every request with a fixed body, and a proxy that forwards every
//! request to a configured origin URL and streams the answer back.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::schema::ProxyConfig;
pub use http::{HttpServer, OriginService, ProxyService};
pub use lifecycle::{Shutdown, Supervisor};
