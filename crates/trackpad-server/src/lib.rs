//! trackpad-server library crate.
//!
//! This crate provides the HTTP service that lets a phone browser act as a
//! trackpad and keyboard for the host it runs on.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Phone browser (JSON over HTTP)
//!         ↕
//! [trackpad-server]
//!   ├── domain/           Pure types: wire messages, ServerConfig
//!   ├── application/      Sessions, gesture → action, dispatch lane, event log
//!   └── infrastructure/
//!         ├── http_server/ axum router and handlers
//!         ├── injector/    InputInjector implementations
//!         ├── network/     Local IP lookup for the phone URL
//!         └── service/     start/stop lifecycle for the control panel
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain` and `trackpad-core`; its only
//!   concurrency primitives are std locks, a tokio channel, and one thread.
//! - `infrastructure` depends on all other layers plus `tokio` and `axum`.
//!
//! # Request flow
//!
//! ```text
//! POST /move ─► parse + validate ─► SessionRegistry::resolve
//!            ─► GestureInterpreter::interpret ─► InjectorDispatcher::enqueue
//!            ─► (dispatcher thread) InputInjector ─► EventLog
//! ```

/// Domain layer: wire message types and configuration (no I/O).
pub mod domain;

/// Application layer: sessions, interpretation, dispatch, event log.
pub mod application;

/// Infrastructure layer: HTTP server, injectors, lifecycle.
pub mod infrastructure;
