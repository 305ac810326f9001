//! Infrastructure layer: everything that touches the outside world.
//!
//! # Layers (for beginners)
//!
//! The crate follows the same three-layer split used elsewhere in this
//! workspace:
//!
//! - `domain` holds plain data: config and wire messages.
//! - `application` holds the logic: sessions, dispatching, the event log.
//! - `infrastructure` (this module) plugs that logic into sockets, files and
//!   OS input APIs.
//!
//! Application code never imports from here; dependencies point inward.

pub mod config_file;
pub mod http_server;
pub mod injector;
pub mod network;
pub mod service;

pub use config_file::load_config;
pub use http_server::{build_router, AppState, ClientKey};
pub use injector::{InjectedCall, RecordingInjector, TracingInjector};
pub use network::{local_ip, phone_url};
pub use service::{ServiceError, ServiceStatus, TrackpadService};
