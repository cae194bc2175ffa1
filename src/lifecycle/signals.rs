//! OS signal handling.

/// Wait for Ctrl+C.
///
/// If the handler cannot be installed this never resolves, leaving the
/// process to run until a service fails.
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}
