//! Server configuration types.
//!
//! [`ServerConfig`] is the single source of truth for all runtime settings.
//! It is built from defaults, optionally overlaid by a TOML file, and finally
//! overridden by command-line flags (see `main.rs`).
//!
//! # TOML file format
//!
//! Every field is optional; missing fields keep their defaults.
//!
//! ```toml
//! bind_address = "0.0.0.0"
//! port = 3000
//! session_timeout_secs = 120
//!
//! [gesture]
//! move_scale = 2.5
//! deadzone_px = 8.0
//! ```
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when the field is absent from the file.  This lets an old or
//! partial config file keep working when new settings are introduced.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use trackpad_core::GestureConfig;

/// Error type for configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but makes no sense (e.g. a zero-length queue).
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// All runtime configuration for the trackpad server.
///
/// Build this once at startup and hand it to
/// [`TrackpadService::new`](crate::infrastructure::service::TrackpadService::new).
///
/// # Example
///
/// ```rust
/// use trackpad_server::domain::ServerConfig;
///
/// let cfg = ServerConfig::default();
/// assert_eq!(cfg.port, 3000);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to listen on.  `0.0.0.0` lets phones on the LAN connect.
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,

    /// TCP port for the HTTP server.
    #[serde(default = "default_port")]
    pub port: u16,

    /// A session with no requests for this long is evicted.
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,

    /// How often the background sweeper looks for idle sessions.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Number of entries the in-memory event log keeps before evicting the oldest.
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,

    /// Maximum number of actions waiting for the injector.
    #[serde(default = "default_dispatch_queue_capacity")]
    pub dispatch_queue_capacity: usize,

    /// Gesture disambiguation thresholds.
    #[serde(default)]
    pub gesture: GestureConfig,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}
fn default_port() -> u16 {
    3000
}
fn default_session_timeout_secs() -> u64 {
    120
}
fn default_sweep_interval_secs() -> u64 {
    5
}
fn default_log_capacity() -> usize {
    500
}
fn default_dispatch_queue_capacity() -> usize {
    256
}

impl Default for ServerConfig {
    /// | Field                   | Default   |
    /// |-------------------------|-----------|
    /// | bind_address            | `0.0.0.0` |
    /// | port                    | 3000      |
    /// | session_timeout_secs    | 120       |
    /// | sweep_interval_secs     | 5         |
    /// | log_capacity            | 500       |
    /// | dispatch_queue_capacity | 256       |
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            session_timeout_secs: default_session_timeout_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            log_capacity: default_log_capacity(),
            dispatch_queue_capacity: default_dispatch_queue_capacity(),
            gesture: GestureConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parses a TOML document, filling absent fields with defaults.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for malformed TOML, [`ConfigError::Invalid`] if
    /// a value fails [`ServerConfig::validate`].
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: ServerConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that would make the service unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_timeout_secs == 0 {
            return Err(ConfigError::Invalid("session_timeout_secs must be > 0".into()));
        }
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid("sweep_interval_secs must be > 0".into()));
        }
        if self.log_capacity == 0 {
            return Err(ConfigError::Invalid("log_capacity must be > 0".into()));
        }
        if self.dispatch_queue_capacity == 0 {
            return Err(ConfigError::Invalid("dispatch_queue_capacity must be > 0".into()));
        }
        let g = &self.gesture;
        if !(g.move_scale.is_finite() && g.move_scale > 0.0) {
            return Err(ConfigError::Invalid("gesture.move_scale must be positive".into()));
        }
        if !(g.deadzone_px.is_finite() && g.deadzone_px >= 0.0) {
            return Err(ConfigError::Invalid("gesture.deadzone_px must be >= 0".into()));
        }
        if !(g.scroll_sensitivity.is_finite() && g.scroll_sensitivity > 0.0) {
            return Err(ConfigError::Invalid("gesture.scroll_sensitivity must be positive".into()));
        }
        if g.tap_max_ms == 0 {
            return Err(ConfigError::Invalid("gesture.tap_max_ms must be > 0".into()));
        }
        if !(g.zoom_threshold_px.is_finite() && g.zoom_threshold_px > 0.0) {
            return Err(ConfigError::Invalid("gesture.zoom_threshold_px must be positive".into()));
        }
        if g.max_pointers == 0 {
            return Err(ConfigError::Invalid("gesture.max_pointers must be > 0".into()));
        }
        Ok(())
    }

    /// The socket address the HTTP server binds to.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
