//! # trackpad-core
//!
//! Shared library for Trackpad Remote containing the touch-sample and
//! input-action types, the gesture interpreter, and key-chord parsing.
//!
//! This crate is used by the server and by benchmarks.  It has zero
//! dependencies on OS APIs, async runtimes, or network sockets.
//!
//! # Architecture overview (for beginners)
//!
//! Trackpad Remote turns a phone into a wireless trackpad and keyboard for a
//! host computer.  The phone's browser sends raw touch samples (finger down,
//! finger moved, finger lifted) to the host.  The host must decide what the
//! user *meant*: a tap is a click, a one-finger slide is a cursor move, a
//! two-finger slide is a scroll, and a pinch is a zoom.
//!
//! This crate (`trackpad-core`) is the pure part of that decision.  It defines:
//!
//! - **`domain`** – Touch samples, input actions, and the stateful
//!   [`GestureInterpreter`] that turns one into the other.
//!
//! - **`keymap`** – Parsing of key codes such as `"enter"` or `"ctrl+c"` into
//!   a typed [`KeyChord`].
//!
//! - **`protocol`** – The monotonically increasing [`SequenceCounter`] used to
//!   number actions for ordering and diagnostics.

pub mod domain;
pub mod keymap;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `trackpad_core::InputAction` instead of the full module path.
pub use domain::action::{InputAction, MouseButton};
pub use domain::gesture::{GestureConfig, GestureInterpreter, GestureMode, GestureState};
pub use domain::touch::{PointerId, TouchPhase, TouchSample};
pub use keymap::{Key, KeyChord, KeyParseError, Modifier, NamedKey};
pub use protocol::sequence::SequenceCounter;
