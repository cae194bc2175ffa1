//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → build services → spawn under supervisor
//!
//! Supervision (supervisor.rs):
//!     First service exit → SupervisorError → process exits non-zero
//!
//! Signals (signals.rs) / Shutdown (shutdown.rs):
//!     Ctrl+C → stop accepting → exit
//! ```
//!
//! # Design Decisions
//! - Fail fast: any listener exit is fatal, there is no restart
//! - No graceful drain on failure; the surviving service is abandoned

pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod supervisor;

pub use shutdown::Shutdown;
pub use startup::launch;
pub use supervisor::{ServiceKind, Supervisor, SupervisorError};
