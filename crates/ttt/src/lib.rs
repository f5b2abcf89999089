//! # Tic-Tac-Toe Server - Main Entry Point
//!
//! Binds the UDP networking core, drives its dispatch loop and handles
//! process lifecycle: CLI parsing, configuration loading, logging setup and
//! graceful shutdown.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration (UDP port 8070)
//! ttt
//!
//! # Specify custom configuration
//! ttt --config production.toml
//!
//! # Override specific settings
//! ttt --port 9000 --log-level debug
//!
//! # JSON logging for production
//! ttt --json-logs
//! ```
//!
//! ## Configuration
//!
//! The server loads configuration from a TOML file (default: `config.toml`).
//! If the file doesn't exist, a default configuration will be created.
//!
//! ## Signal Handling
//!
//! The server handles graceful shutdown on:
//! - SIGINT (Ctrl+C)
//! - SIGTERM (Unix systems)
//!
//! A second signal during shutdown exits immediately.

use tracing::error;

mod app;
mod cli;
mod config;
mod logging;
mod signals;

use app::Application;
use cli::CliArgs;

/// Runs the server to completion.
///
/// # Exit Codes
///
/// * **0**: Successful execution and shutdown
/// * **1**: Error during startup, configuration, or runtime
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Logging settings come from the file before the full load validates it.
    let mut config = AppConfig::load_from_file(&args.config_path)
        .await
        .unwrap_or_default();
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }

    if let Err(e) = logging::setup_logging(&config.logging, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e:?}");
            std::process::exit(1);
        }
    }

    Ok(())
}

pub use config::{AppConfig, LoggingSettings, ServerSettings, TransportSettings};
