//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (hyper HTTP/1.1, timeouts, middleware)
//!     → origin.rs (fixed response)              [origin service]
//!     → proxy.rs (build outbound, dispatch)     [proxy service]
//!         → response.rs (relay headers + streamed body, map errors)
//!     → Send to client
//! ```

pub mod origin;
pub mod proxy;
pub mod response;
pub mod server;

pub use origin::{OriginService, ORIGIN_RESPONSE_BODY};
pub use proxy::{default_client, ForwardError, HttpClient, OriginTarget, ProxyService};
pub use server::HttpServer;
