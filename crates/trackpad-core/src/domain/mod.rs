//! Domain entities for Trackpad Remote.
//!
//! This module contains pure business logic with no infrastructure dependencies.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! Clean Architecture organises code into concentric layers.  The innermost
//! layer is called the **domain**.  Domain code:
//!
//! - Contains the core rules of the application.
//! - Has **no** imports from OS APIs, network libraries, or UI frameworks.
//! - Can be compiled and tested on any platform without any external setup.
//!
//! Here the core rule is gesture disambiguation: given a stream of raw touch
//! samples, decide which host input action (if any) each one produces.

/// Discrete host input actions produced by the interpreter.
pub mod action;

/// The gesture interpreter and its per-session state.
///
/// See [`gesture::GestureInterpreter`] for the main type.
pub mod gesture;

/// Raw touch samples as reported by the phone.
pub mod touch;
