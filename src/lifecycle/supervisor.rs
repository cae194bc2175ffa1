//! First-failure supervision of the running services.
//!
//! Each service runs as its own task and reports exactly one terminal outcome
//! on a shared channel. The supervisor is the only consumer and returns on the
//! first outcome it sees. Nothing is drained: the caller is expected to exit.

use std::fmt;
use std::future::Future;
use tokio::sync::mpsc;

use crate::net::listener::ListenerError;

/// The services this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    Origin,
    Proxy,
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceKind::Origin => f.write_str("origin"),
            ServiceKind::Proxy => f.write_str("proxy"),
        }
    }
}

/// Why a service is no longer serving.
#[derive(Debug, thiserror::Error)]
pub enum ExitReason {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    /// The service returned without an error. A listener is never expected to stop.
    #[error("listener stopped serving")]
    Stopped,

    #[error("service task panicked: {0}")]
    Panicked(String),
}

/// Terminal outcome reported to the supervisor.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("{service} service exited: {reason}")]
    ServiceExited {
        service: ServiceKind,
        #[source]
        reason: ExitReason,
    },

    #[error("no services were started")]
    NoServices,
}

impl SupervisorError {
    /// The service that caused the exit, if any.
    pub fn service(&self) -> Option<ServiceKind> {
        match self {
            SupervisorError::ServiceExited { service, .. } => Some(*service),
            SupervisorError::NoServices => None,
        }
    }
}

struct ServiceExit {
    service: ServiceKind,
    reason: ExitReason,
}

/// Runs services concurrently and reports the first one to stop.
pub struct Supervisor {
    tx: mpsc::UnboundedSender<ServiceExit>,
    rx: mpsc::UnboundedReceiver<ServiceExit>,
}

impl Supervisor {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    /// Start `task` as an independent unit of concurrency.
    pub fn spawn<F>(&mut self, service: ServiceKind, task: F)
    where
        F: Future<Output = Result<(), ListenerError>> + Send + 'static,
    {
        let tx = self.tx.clone();
        let handle = tokio::spawn(task);

        tokio::spawn(async move {
            let reason = match handle.await {
                Ok(Ok(())) => ExitReason::Stopped,
                Ok(Err(e)) => ExitReason::Listener(e),
                Err(e) => ExitReason::Panicked(e.to_string()),
            };
            tracing::error!(service = %service, reason = %reason, "Service exited");
            let _ = tx.send(ServiceExit { service, reason });
        });
    }

    /// Wait for the first service to exit.
    ///
    /// Never returns success: any exit is a failure of the process.
    pub async fn wait(self) -> SupervisorError {
        let Self { tx, mut rx } = self;
        drop(tx);

        match rx.recv().await {
            Some(ServiceExit { service, reason }) => SupervisorError::ServiceExited { service, reason },
            None => SupervisorError::NoServices,
        }
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}
