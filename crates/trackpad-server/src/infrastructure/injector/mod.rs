//! [`InputInjector`](crate::application::InputInjector) implementations.
//!
//! - [`recording`]: keeps every call in memory; used by tests.
//! - [`tracing_injector`]: logs every call and touches nothing; the binary's
//!   default "dry run" backend.
//!
//! Real OS backends live outside this crate and plug in through the same
//! trait.

pub mod recording;
pub mod tracing_injector;

pub use recording::{InjectedCall, RecordingInjector};
pub use tracing_injector::TracingInjector;
