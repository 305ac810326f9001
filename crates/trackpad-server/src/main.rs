//! Trackpad server: entry point.
//!
//! Starts the HTTP service, prints the URL to open on the phone, and runs
//! until Ctrl+C.
//!
//! # Usage
//!
//! ```text
//! trackpad-server [OPTIONS]
//!
//! Options:
//!   --port <PORT>               HTTP port [default: 3000]
//!   --bind <IP>                 Interface to listen on [default: 0.0.0.0]
//!   --config <FILE>             TOML config file
//!   --session-timeout <SECS>    Idle session timeout [default: 120]
//! ```
//!
//! # Precedence
//!
//! Built-in defaults, then the `--config` file, then flags (or their
//! environment variables).  A flag that is not given leaves the file's value
//! alone.
//!
//! | Variable                   | Flag                |
//! |----------------------------|---------------------|
//! | `TRACKPAD_PORT`            | `--port`            |
//! | `TRACKPAD_BIND`            | `--bind`            |
//! | `TRACKPAD_CONFIG`          | `--config`          |
//! | `TRACKPAD_SESSION_TIMEOUT` | `--session-timeout` |
//!
//! Log verbosity comes from `RUST_LOG` (default `info`).  Set
//! `RUST_LOG=trackpad::inject=debug` to see every injected call.

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use trackpad_server::domain::ServerConfig;
use trackpad_server::infrastructure::{load_config, local_ip, phone_url, TracingInjector, TrackpadService};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Use a phone browser as a trackpad and keyboard for this computer.
#[derive(Debug, Parser)]
#[command(
    name = "trackpad-server",
    about = "Turns phone touch gestures into mouse and keyboard input",
    version
)]
struct Cli {
    /// TCP port for the HTTP server.
    #[arg(long, env = "TRACKPAD_PORT")]
    port: Option<u16>,

    /// IP address to bind to.
    ///
    /// `0.0.0.0` accepts phones on the LAN; `127.0.0.1` accepts only local
    /// connections.
    #[arg(long, env = "TRACKPAD_BIND")]
    bind: Option<String>,

    /// Path to a TOML config file.  Must exist when given.
    #[arg(long, env = "TRACKPAD_CONFIG")]
    config: Option<PathBuf>,

    /// Seconds of inactivity before a phone's session is dropped.
    #[arg(long, env = "TRACKPAD_SESSION_TIMEOUT")]
    session_timeout: Option<u64>,
}

impl Cli {
    /// Builds the effective [`ServerConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded, `--bind` is not
    /// an IP address, or the merged config fails validation.
    fn into_server_config(self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("failed to load config file {}", path.display()))?,
            None => ServerConfig::default(),
        };

        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(bind) = &self.bind {
            config.bind_address = bind
                .parse::<IpAddr>()
                .with_context(|| format!("invalid bind address: '{bind}'"))?;
        }
        if let Some(secs) = self.session_timeout {
            config.session_timeout_secs = secs;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging setup ─────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_server_config()?;
    let service = TrackpadService::new(config, Arc::new(TracingInjector));
    let port = service.config().port;
    let addr = service
        .start(port)
        .await
        .with_context(|| format!("could not start the trackpad server on port {port}"))?;

    info!("open {} on your phone", phone_url(addr, local_ip()));

    // ── Wait for Ctrl+C ───────────────────────────────────────────────────────
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for Ctrl+C signal: {e}");
    } else {
        info!("received Ctrl+C, shutting down");
    }

    service.stop().await;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn bare_cli() -> Cli {
        Cli {
            port: None,
            bind: None,
            config: None,
            session_timeout: None,
        }
    }

    #[test]
    fn test_cli_without_args_uses_defaults() {
        // Arrange
        let cli = bare_cli();

        // Act
        let config = cli.into_server_config().unwrap();

        // Assert
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_cli_port_override() {
        let cli = Cli::try_parse_from(["trackpad-server", "--port", "8123"]).unwrap();
        assert_eq!(cli.port, Some(8123));
    }

    #[test]
    fn test_cli_session_timeout_override() {
        let cli = Cli {
            session_timeout: Some(30),
            ..bare_cli()
        };
        let config = cli.into_server_config().unwrap();
        assert_eq!(config.session_timeout_secs, 30);
    }

    #[test]
    fn test_cli_bind_override() {
        let cli = Cli {
            bind: Some("127.0.0.1".to_string()),
            ..bare_cli()
        };
        let config = cli.into_server_config().unwrap();
        assert_eq!(config.bind_address.to_string(), "127.0.0.1");
    }

    #[test]
    fn test_invalid_bind_returns_error() {
        let cli = Cli {
            bind: Some("not.an.ip".to_string()),
            ..bare_cli()
        };
        assert!(cli.into_server_config().is_err());
    }

    #[test]
    fn test_zero_session_timeout_returns_error() {
        let cli = Cli {
            session_timeout: Some(0),
            ..bare_cli()
        };
        assert!(cli.into_server_config().is_err());
    }

    #[test]
    fn test_missing_config_file_returns_error() {
        let cli = Cli {
            config: Some(PathBuf::from("/definitely/not/here/trackpad.toml")),
            ..bare_cli()
        };
        assert!(cli.into_server_config().is_err());
    }

    #[test]
    fn test_flag_overrides_config_file() {
        // Arrange: file sets port 4000 and a timeout, flag sets port 5000
        let path = std::env::temp_dir().join(format!("trackpad-cli-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"port = 4000\nsession_timeout_secs = 45\n").unwrap();
        let cli = Cli {
            port: Some(5000),
            config: Some(path.clone()),
            ..bare_cli()
        };

        // Act
        let config = cli.into_server_config().unwrap();

        // Assert
        assert_eq!(config.port, 5000);
        assert_eq!(config.session_timeout_secs, 45);
        std::fs::remove_file(path).ok();
    }
}
