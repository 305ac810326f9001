//! Application layer for trackpad-server.
//!
//! Orchestrates the domain types and the core gesture interpreter:
//!
//! - [`session_registry`]: one [`Session`](session_registry::Session) per
//!   client key, idle eviction, and the injector "controller" claim.
//! - [`dispatcher`]: the single lane through which every action reaches the
//!   [`InputInjector`](inject::InputInjector).
//! - [`event_log`]: bounded, subscribable log of connection and action events.
//! - [`control`]: the use case tying them together for each request.
//!
//! Nothing here awaits.  The HTTP handlers call straight into [`control`]
//! and return.

pub mod control;
pub mod dispatcher;
pub mod event_log;
pub mod inject;
pub mod session_registry;

pub use control::ControlService;
pub use dispatcher::{DispatchError, DispatchJob, InjectorDispatcher};
pub use event_log::{EventLog, LogEntry, LogLevel};
pub use inject::{InjectorError, InputInjector};
pub use session_registry::{ResolveOutcome, Resolved, Session, SessionRegistry};
