//! Main application logic and lifecycle management.
//!
//! This module contains the `Application` struct that loads configuration,
//! binds the network server, drives its dispatch loop on a fixed interval and
//! shuts it down when a termination signal arrives.

use crate::{
    cli::CliArgs,
    config::AppConfig,
    logging::display_banner,
    signals::{wait_for_shutdown_signal, wait_for_shutdown_signal_silent},
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use ttt_server::{DispatchStats, NetworkServer};

const STATS_INTERVAL: Duration = Duration::from_secs(60);

/// Owns the configured server for the lifetime of the process.
///
/// # Architecture
///
/// * **Configuration Management**: Loads and validates configuration from files and CLI
/// * **Dispatch Loop**: Polls the server on the configured interval from a single task
/// * **Health Monitoring**: Periodic statistics in the log
/// * **Graceful Shutdown**: Disconnects every peer on the first signal, exits on the second
pub struct Application {
    /// Loaded application configuration
    config: AppConfig,
    /// Network server instance
    server: NetworkServer,
}

impl Application {
    /// Creates a new application instance.
    ///
    /// # Arguments
    ///
    /// * `args` - Parsed command-line arguments
    ///
    /// # Returns
    ///
    /// A configured `Application` with its socket bound, or an error if the
    /// configuration is invalid or the port could not be bound.
    ///
    /// # Process
    ///
    /// 1. Load configuration from file (creating default if missing)
    /// 2. Apply command-line argument overrides
    /// 3. Validate merged configuration
    /// 4. Display startup banner
    /// 5. Bind the network server
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        if let Some(port) = args.port {
            config.server.port = port;
        }

        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }

        if args.json_logs {
            config.logging.json_format = true;
        }

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        info!("✅ Configuration loaded and validated successfully");

        display_banner();

        let server_config = config.to_server_config()?;
        let server = NetworkServer::start(server_config)?;

        Ok(Self { config, server })
    }

    /// Address the server socket is bound to.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.local_addr()
    }

    /// Runs the dispatch loop until a shutdown signal is received.
    ///
    /// The server is polled on the configured interval. Ticks missed while a
    /// poll overran are delayed rather than bunched up.
    pub async fn run(mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.log_configuration_summary();

        let mut poll = tokio::time::interval(self.server.config().poll_interval());
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut report = tokio::time::interval(STATS_INTERVAL);
        report.set_missed_tick_behavior(MissedTickBehavior::Delay);
        report.tick().await;

        let shutdown = wait_for_shutdown_signal();
        tokio::pin!(shutdown);

        match self.local_addr() {
            Some(addr) => info!("🎮 Ready to accept connections on {}", addr),
            None => info!("🎮 Ready to accept connections"),
        }
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        let mut last = self.server.stats();
        loop {
            tokio::select! {
                result = &mut shutdown => {
                    result?;
                    break;
                }
                _ = poll.tick() => {
                    self.server.poll_events();
                }
                _ = report.tick() => {
                    let stats = self.server.stats();
                    let connections = self.server.sessions().connection_count();
                    log_periodic_statistics(&last, &stats, connections);
                    last = stats;
                }
            }
        }

        tokio::spawn(async {
            if let Err(e) = wait_for_shutdown_signal_silent().await {
                error!("Failed to set up forced shutdown signal handler: {e}");
                return;
            }

            warn!("Shutdown signal received again, exiting immediately");
            std::process::exit(1);
        });

        info!("🛑 Shutdown signal received, disconnecting clients...");
        self.server.shutdown();
        // One more pass flushes the disconnect notifications.
        self.server.poll_events();

        log_final_statistics(&self.server.stats());
        info!("✅ Tic-Tac-Toe server shutdown complete");
        Ok(())
    }

    fn log_configuration_summary(&self) {
        let server = &self.config.server;
        let transport = &self.config.transport;
        info!("📋 Configuration Summary:");
        info!("  🌐 Bind address: {}:{}", server.bind_address, server.port);
        info!("  ⏱️ Poll interval: {}ms", server.poll_interval_ms);
        match server.max_connections {
            Some(max) => info!("  👥 Max connections: {}", max),
            None => info!("  👥 Max connections: unlimited"),
        }
        if !server.banned_ips.is_empty() {
            info!("  🚫 Banned addresses: {}", server.banned_ips.join(", "));
        }
        info!(
            "  📶 {} client slots | resend every {}ms | max message {} bytes",
            transport.max_clients, transport.resend_interval_ms, transport.max_packet_size
        );
    }
}

fn log_periodic_statistics(last: &DispatchStats, now: &DispatchStats, connections: usize) {
    let handled = now.messages_handled - last.messages_handled;
    let dropped = now.messages_dropped - last.messages_dropped;
    info!(
        "📊 Server Health - {} connections | {} messages/min | {} dropped/min",
        connections, handled, dropped
    );
    if dropped > handled && dropped > 100 {
        warn!(
            "🔥 More messages dropped than handled in the last minute ({} vs {})",
            dropped, handled
        );
    }
}

fn log_final_statistics(stats: &DispatchStats) {
    info!("📊 Final Statistics:");
    info!("  - Messages handled: {}", stats.messages_handled);
    info!("  - Messages dropped: {}", stats.messages_dropped);
    info!(
        "  - Connections accepted/rejected: {}/{}",
        stats.connections_accepted, stats.connections_rejected
    );
    info!("  - Disconnects: {}", stats.disconnects);
    info!("  - Network errors: {}", stats.network_errors);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args(config_path: PathBuf) -> CliArgs {
        CliArgs {
            config_path,
            port: Some(0),
            log_level: None,
            json_logs: false,
        }
    }

    async fn write_config(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("config.toml");
        let mut config = AppConfig::default();
        config.server.bind_address = "127.0.0.1".to_string();
        let toml_content = toml::to_string_pretty(&config).unwrap();
        tokio::fs::write(&path, toml_content).await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_application_binds_with_port_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir).await;

        let app = Application::new(args(path)).await.unwrap();
        let addr = app.local_addr().unwrap();
        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
        assert!(app.config.logging.level == "info");
    }

    #[tokio::test]
    async fn test_application_rejects_invalid_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir).await;

        let mut args = args(path);
        args.log_level = Some("chatty".to_string());
        let err = Application::new(args).await.err().unwrap();
        assert!(err.to_string().contains("Configuration validation failed"));
    }

    #[tokio::test]
    async fn test_json_logs_flag_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir).await;

        let mut args = args(path);
        args.json_logs = true;
        let app = Application::new(args).await.unwrap();
        assert!(app.config.logging.json_format);
    }
}
