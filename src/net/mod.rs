//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → connection.rs (connection id, activity tracking)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - Idle detection is driven by observed I/O, not by request count

pub mod connection;
pub mod listener;

pub use connection::{Activity, ActivityStream, ConnectionId};
pub use listener::{Listener, ListenerError};
