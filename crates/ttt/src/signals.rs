//! Signal handling for graceful server shutdown.
//!
//! Cross-platform wait for a termination request. The first signal starts a
//! graceful shutdown; the application listens again afterwards so that a
//! second signal can force an immediate exit.

use tokio::signal;
use tracing::info;

/// Waits for a shutdown signal and logs its arrival.
///
/// # Platform Support
///
/// * **Unix platforms**: Handles SIGINT and SIGTERM signals
/// * **Windows**: Handles Ctrl+C signal
///
/// # Returns
///
/// `Ok(())` once a signal is received, or an error if the signal handlers
/// could not be installed.
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    wait_for_shutdown_signal_silent().await?;
    info!("📡 Received shutdown signal - initiating graceful shutdown");
    Ok(())
}

pub async fn wait_for_shutdown_signal_silent() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => (),
            _ = sigterm.recv() => ()
        }
    }

    #[cfg(windows)]
    signal::ctrl_c().await?;

    Ok(())
}
