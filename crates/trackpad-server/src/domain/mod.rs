//! Domain layer for trackpad-server.
//!
//! Pure types with no dependencies on I/O, networking, or async runtimes:
//!
//! - Wire message types (the JSON "language" between phone and host) and
//!   their validation rules.
//! - Server configuration.
//!
//! Anything that opens a socket, reads a clock, or spawns a task belongs in
//! the outer layers.

pub mod config;
pub mod messages;

pub use config::{ConfigError, ServerConfig};
pub use messages::{ProtocolError, StatusResponse};
