//! OS signal handling for graceful shutdown

/// Resolve once SIGINT or SIGTERM (Ctrl+C on Windows) arrives.
///
/// If the handlers cannot be installed the future never resolves, so the
/// process keeps serving instead of shutting down immediately.
pub async fn shutdown_signal() {
    if let Err(e) = wait_for_signal().await {
        tracing::error!("Signal handler error: {}", e);
        std::future::pending::<()>().await;
    }

    tracing::info!("Shutdown signal received");
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = sigint.recv() => tracing::info!("Received SIGINT"),
        _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
    }

    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    tracing::info!("Received Ctrl+C");
    Ok(())
}
